// Module declarations
pub mod aggregator;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod feed;
pub mod formatting;
pub mod monitor;
pub mod pricing;
pub mod streaming;
pub mod types;

// Re-export commonly used items
pub use aggregator::{aggregate, primary_model};
pub use config::Config;
pub use error::{CostError, Result};
pub use feed::{InMemoryFeed, MessageFeed, Subscription};
pub use monitor::CostMonitor;
pub use pricing::{PricingEntry, PricingTable};
pub use streaming::{StreamingSlots, merge_streaming};
pub use types::{
    ColorClass, ConversationId, Cost, CostDisplay, CostSummary, Message, MessageId, TokenCount,
};
