// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;

use stylelens::AppState;
use stylelens::config::AppConfig;
use stylelens::handlers;
use stylelens::services::{
    AnthropicVisionClient, ImageProcessor, RedisImageStore, ResponseCache, VisionOrchestrator,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting StyleLens service...");

    let config = Arc::new(AppConfig::from_env());
    if config.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY is not set; analysis requests will be rejected");
    }

    // Initialize services
    let image_store = Arc::new(
        RedisImageStore::new(&config.redis_url)
            .await
            .with_context(|| format!("failed to connect to Redis at {}", config.redis_url))?,
    );
    let cache = Arc::new(ResponseCache::new());
    let _sweeper = cache.spawn_sweeper(config.cache_sweep_interval);

    let client = Arc::new(AnthropicVisionClient::new(
        config.anthropic_api_key.clone().unwrap_or_default(),
        config.anthropic_base_url.clone(),
    ));
    let orchestrator = VisionOrchestrator::new(config.clone(), client, cache)
        .with_image_processor(ImageProcessor::new().with_store(image_store.clone()))
        .with_attempt_timeout(config.request_timeout);

    let app_state = AppState {
        orchestrator: Arc::new(orchestrator),
        image_store,
        image_processor: Arc::new(ImageProcessor::new()),
    };

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}
