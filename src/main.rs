use std::process::ExitCode;

use clap::Parser;
use taskboard::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    cli::cache::run(cli.command).await
}
