mod config;
mod db;
mod providers;
mod rate_limit;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use providers::HostedProviders;
use rate_limit::{RateLimitConfig, RateLimiter};
use services::feedback::{FeedbackStore, LogOnlyFeedbackStore, PgFeedbackStore};
use services::inference::InferenceClient;
use services::visitor::{VisitorRegistry, spawn_visitor_sweep};

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let feedback: Arc<dyn FeedbackStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool(url).await.expect("database init failed");
            Arc::new(PgFeedbackStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; contact submissions will only be logged");
            Arc::new(LogOnlyFeedbackStore)
        }
    };

    let http = reqwest::Client::builder()
        .timeout(config.provider_timeout)
        .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .expect("failed to build http client");
    let providers = Arc::new(HostedProviders::new(http, config.primary.clone(), config.secondary.clone()));
    let inference = InferenceClient::new(&config.inference).expect("failed to build inference client");

    let visitors = Arc::new(VisitorRegistry::new(providers, config.visitors.idle));
    let rate_limiter = RateLimiter::new(RateLimitConfig::from_env());
    let state = state::AppState::new(
        visitors.clone(),
        feedback,
        Arc::new(inference),
        rate_limiter.clone(),
        config.cookie_secure,
    );

    let _sweep = spawn_visitor_sweep(visitors, rate_limiter, config.visitors.sweep_interval);

    let app = routes::app(state, &config.website_dir);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, website_dir = %config.website_dir.display(), "enerlytics listening");
    axum::serve(listener, app).await.expect("server failed");
}
