//! Server entry point.
//!
//! Parses configuration, then hands control to `noteit_server::run`.

use clap::Parser;
use noteit_server::ServerConfig;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::parse();
    match noteit_server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Logging may not be up yet, so report on stderr as well.
            log::error!("event=server_exit module=http status=error error={err}");
            eprintln!("noteit_server: {err}");
            ExitCode::FAILURE
        }
    }
}
