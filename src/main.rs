// Pitwall API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod routes;
mod services;

use config::AppConfig;
use db::store::StoreClient;
use routes::AppState;
use services::cache::{FreshnessCache, SystemClock};
use services::ergast::ErgastClient;
use services::timezone::TimezoneResolver;
use services::weather::WeatherClient;
use services::youtube::YouTubeClient;

/// Pitwall API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pitwall API",
        version = "0.1.0",
        description = "Race-data aggregation API for a Formula 1 dashboard. \
            Merges results and standings from an Ergast-compatible provider, \
            race-weekend weather, and curated track metadata into one race \
            record, cached in-process and persisted per (season, round). \
            Updates run through a separate cron-triggered pipeline.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Race data", description = "Latest assembled race record"),
        (name = "Updates", description = "Privileged ingest and enrichment triggers"),
    ),
    paths(
        routes::health::health_check,
        routes::latest::get_latest,
        routes::update::trigger_update,
        routes::update::trigger_highlights,
        routes::update::flush_cache,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::update::UpdateResponse,
            db::models::RaceRecord,
            db::models::RaceInfo,
            db::models::Track,
            db::models::Weather,
            db::models::WeatherEntry,
            db::models::Highlights,
            db::models::ResultEntry,
            db::models::DriverStandingEntry,
            db::models::ConstructorStandingEntry,
            db::models::NextRace,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitwall_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // One client per upstream; all share the same short request timeout.
    let ergast = ErgastClient::new(&config.ergast_base);
    let weather = WeatherClient::new(&config.weather_base);
    let youtube = YouTubeClient::new(&config.youtube_base, &config.youtube_api_key);
    let store = StoreClient::new(
        &config.data_api_uri,
        &config.data_api_key,
        &config.data_api_source,
        &config.data_api_database,
    );

    // The timezone finder loads the full zone geometry; build it once.
    let tz = Arc::new(TimezoneResolver::new());
    tracing::info!("Timezone resolver initialized");

    let clock: Arc<dyn services::cache::Clock> = Arc::new(SystemClock);
    let cache = Arc::new(FreshnessCache::new(clock.clone()));

    let state = AppState {
        ergast,
        weather,
        youtube,
        store,
        tz,
        cache,
        clock,
    };

    // CORS — read-only API, restrict methods to GET; expose the degraded
    // marker so the frontend can render a hint.
    let origin = match &config.frontend_uri {
        Some(uri) => match uri.parse() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!("FRONTEND_URI {:?} is not a valid origin, allowing any", uri);
                AllowOrigin::any()
            }
        },
        None => AllowOrigin::any(),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any)
        .expose_headers([routes::latest::DEGRADED_HEADER
            .parse::<axum::http::HeaderName>()
            .unwrap()]);

    // Build router
    let app = Router::new()
        .route("/status", get(routes::health::health_check))
        .route("/api/latest", get(routes::latest::get_latest))
        .route("/api/update", get(routes::update::trigger_update))
        .route(
            "/api/update/highlights",
            get(routes::update::trigger_highlights),
        )
        .route("/api/update/cache", get(routes::update::flush_cache))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
