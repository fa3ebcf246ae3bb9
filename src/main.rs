use std::process::ExitCode;

use clap::Parser;
use gadget_harness::cli::{self, Cli};
use gadget_harness::logger;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);
    cli::execute(cli).await
}
