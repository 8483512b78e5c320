use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use playbook_funnel::config::ServerConfig;
use playbook_funnel::funnel::{FeatureFlags, FlagSet};
use playbook_funnel::funnel::flags::flag_names;
use playbook_funnel::leads::{
    IntakeRouteState, LeadIntake, LogNotifier, MemoryLeadRepository, intake_routes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let flags = FlagSet::from_env();

    eprintln!("📈 Playbook funnel v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Intake: http://{}/api/playbook-submit", config.bind_addr);
    eprintln!(
        "   CORS origin: {}",
        config.allowed_origin.as_deref().unwrap_or("*")
    );
    for name in flag_names::ALL {
        tracing::debug!(flag = name, enabled = flags.is_enabled(name), "Feature flag");
    }

    // ── Intake ──────────────────────────────────────────────────────────
    let repo = MemoryLeadRepository::new();
    let intake = Arc::new(LeadIntake::new(repo, Arc::new(LogNotifier)));

    let allow_origin = match config.allowed_origin {
        Some(ref origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin)
                .with_context(|| format!("invalid PLAYBOOK_ALLOWED_ORIGIN: {origin}"))?,
        ),
        None => AllowOrigin::from(Any),
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = intake_routes(IntakeRouteState { intake }).layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Intake server started");
    axum::serve(listener, app).await?;

    Ok(())
}
