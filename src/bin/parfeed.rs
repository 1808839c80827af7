//! `parfeed [consumers]`: serve JSON feed requests from stdin to stdout.

use parfeed::prelude::{Dispatcher, JsonRequestSource, JsonResponseSink, ServerConfig};
use std::io::{self, BufReader};
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    // stdout carries responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(io::stderr)
        .init();

    let config = ServerConfig::from_args(std::env::args().skip(1));
    let source = JsonRequestSource::new(BufReader::new(io::stdin()));
    let sink = JsonResponseSink::new(io::stdout());

    match Dispatcher::new(config).run(source, sink) {
        Ok(summary) => {
            info!(
                "served {} request(s) in {} mode",
                summary.processed, summary.mode
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
