use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostError {
    // Configuration errors
    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid price for model '{model}': {price}")]
    InvalidPrice { model: String, price: f64 },

    #[error("Pricing table has no '{key}' entry")]
    MissingDefaultPrice { key: &'static str },

    #[error("Streaming slot count must be at least 1")]
    NoStreamingSlots,

    // Input errors
    #[error("Failed to read from stdin")]
    StdinRead(#[from] std::io::Error),

    #[error("Failed to parse event: {line}")]
    EventParse {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CostError>;
