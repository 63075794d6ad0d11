#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use clap::Parser;
    use day_planner::{DayPlanner, PlannerCliArgs, PlannerConfig, SystemClock, http_api};

    let cli = PlannerCliArgs::parse();
    let config = PlannerConfig::load(&cli)?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!(
        backend = %config.storage.backend,
        path = %config.storage.path.display(),
        "opening task storage"
    );
    let store = config.storage.open()?;
    let mut planner = DayPlanner::open(store, Arc::new(SystemClock));
    for notice in planner.take_startup_notices() {
        tracing::warn!(message = %notice.message, "startup");
    }

    http_api::serve(addr, planner).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
