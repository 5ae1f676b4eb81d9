//! pegasus-cluster
//!
//! Add, remove, and rolling-update nodes of a Pegasus cluster.

use std::process::ExitCode;

use clap::Parser;

use pegasus_cluster_cli::Cli;
use pegasus_cluster_common::telemetry::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format) {
        println!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
