use casegen_cli::{cli, commands, logging};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli::command().get_matches();
    logging::init(cli::global_flag(&matches, "log-json"));

    match commands::dispatch(&matches).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "casegen failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
