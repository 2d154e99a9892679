use std::sync::Arc;

use health_dashboard::{DashboardResult, HealthManager};
use health_dashboard::config::DashboardConfig;
use health_store_client::config::Config;
use health_store_client::http_client::ReqwestHealthStore;

#[tokio::main]
async fn main() -> DashboardResult<()> {
    // `HEALTH_DASHBOARD_LOG_LEVEL`, then `RUST_LOG`, default `info`.
    let config = DashboardConfig::from_env();
    let env_filter = tracing_subscriber::EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!("health_dashboard: log filter: {}", config.log_filter);
    tracing::info!("health_dashboard: number locale: {}", config.locale.tag());

    let store_config = Config::from_env()?;
    let store = ReqwestHealthStore::from_config(&store_config);
    tracing::info!("health_dashboard: health store at {}", store_config.base_url);

    let manager = HealthManager::with_locale(Arc::new(store), config.locale);
    if let Err(e) = manager.start().await {
        tracing::error!("health_dashboard: {}", e);
        return Err(e);
    }

    let snapshot = manager.wait_until_settled().await?;
    println!("{}", snapshot.to_json_pretty()?);

    Ok(())
}
