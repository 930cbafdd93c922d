//! Switchyard CLI entry point.

use clap::Parser;

use switchyard::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = switchyard::cli::run(cli).await {
        switchyard::cli::handle_error(err, json);
    }
}
