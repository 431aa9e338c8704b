use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    osmo_etf_driver::cli::run_cli().await
}
