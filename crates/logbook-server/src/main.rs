//! Operations logbook server binary.

use clap::Parser;
use logbook_server::{Args, LogFormat, LogbookServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.server_config();
    info!(
        bind = %config.bind_addr,
        max_page_size = config.service.max_page_size,
        time_zone = %config.service.time_zone,
        "starting logbook server"
    );

    let server = LogbookServer::new(config);
    server.serve_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
