//! wmcheck Server Entry Point

use clap::Parser;
use wmcheck::cli::{serve, Cli};
use wmcheck::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = serve::execute(cli.into_serve_args()).await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        drop(log_guard);
        std::process::exit(1);
    }
}
