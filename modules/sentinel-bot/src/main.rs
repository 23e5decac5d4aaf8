use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sentinel_bot::build_action_loop;
use sentinel_chain::RpcTransport;
use sentinel_common::{Config, LogFormat};

fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("sentinel=info".parse()?);

    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logging follows the configuration; a configuration that fails to load
    // is reported in the default format.
    let config = Config::from_env();
    init_logging(config.as_ref().map(|c| c.log_format).unwrap_or_default())?;
    info!("Sentinel starting...");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Ok(ExitCode::FAILURE);
        }
    };
    config.log_redacted();

    let transport = Arc::new(RpcTransport::new(
        &config.rpc_url,
        config.contract_address,
        config.account,
    )?);

    let mut action_loop = match build_action_loop(&config, transport).await {
        Ok(action_loop) => action_loop,
        Err(_) => return Ok(ExitCode::FAILURE),
    };

    let stop = action_loop.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping after the current iteration");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let report = action_loop.run().await;
    info!("Sentinel complete. {report}");
    Ok(ExitCode::SUCCESS)
}
