pub mod color_class;
pub mod cost;
pub mod display;
pub mod ids;
pub mod message;
pub mod summary;

pub use color_class::ColorClass;
pub use cost::Cost;
pub use display::CostDisplay;
pub use ids::{ConversationId, MessageId};
pub use message::{Message, TokenCount, Tokens, Usage};
pub use summary::CostSummary;
