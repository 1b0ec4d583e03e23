use clap::Parser;
use nodeward::cli::{Cli, CliHandler};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = CliHandler::handle(cli).await {
        eprintln!("Error: {:#}", anyhow::Error::new(e));
        process::exit(1);
    }
}
