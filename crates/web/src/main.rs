use std::process::ExitCode;

use pixel_web::config::Config;
use pixel_web::Server;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::builder().config(config).build() {
        Ok(server) => server,
        Err(e) => {
            eprintln!("can't build server: {e}");
            return ExitCode::FAILURE;
        }
    };

    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}
