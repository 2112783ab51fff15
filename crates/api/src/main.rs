use std::sync::Arc;

use anyhow::Context;

use shipline_api::{app, config::ApiConfig};
use shipline_infra::{LoggingNotifier, NotificationWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shipline_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(app::services::build_services(&config).context("failed to start services")?);

    let notifier = NotificationWorker::spawn("notifications", services.bus(), LoggingNotifier)
        .context("failed to spawn notification worker")?;

    let app = app::router(&config, services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    notifier.shutdown();
    tracing::info!("shut down");
    Ok(())
}
