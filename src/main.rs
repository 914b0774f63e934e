use anyhow::{Context, Result};
use docu_filetype::config::load_config;
use docu_filetype::file_utility::OfficeFileUtility;
use docu_filetype::{logging, server};

async fn run() -> Result<()> {
    let config = load_config()?;
    let utility = OfficeFileUtility::with_config(&config)
        .context("Failed to build file utility")?;
    server::run_server(utility, config).await
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init()?;

    // Startup and stdout failures are fatal; request errors are answered in-band
    if let Err(e) = run().await {
        tracing::error!("Server crashed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
