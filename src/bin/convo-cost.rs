use std::rc::Rc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use convo_cost::Result;
use convo_cost::events::process_line;
use convo_cost::{Config, CostMonitor, InMemoryFeed};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a clean status stream.
    // Set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Force colored output even when not in a TTY
    colored::control::set_override(true);

    let config = Config::load()?;
    let feed = InMemoryFeed::new();
    let mut monitor = CostMonitor::from_config(Rc::new(feed.clone()), &config);

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(status) = process_line(&line, &feed, &mut monitor) {
            println!("{}", status);
        }
    }

    Ok(())
}
