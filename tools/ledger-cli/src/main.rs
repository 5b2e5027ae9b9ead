//! # Gridplot CLI — Entry Point
//!
//! Minimal main that delegates all logic to the `cli` module.

mod cli;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let exit_code = cli::run().await;
    std::process::exit(exit_code);
}
