use clap::Parser;
use taxi_analytics::cli::{run, Cli};
use taxi_analytics::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
