use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::{Extension, middleware, routing::get};
use config::Config;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::borrow::Cow;
use std::env;
use std::future::ready;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, prelude::*};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_swagger_ui::SwaggerUi;

mod address;
mod classifier;
mod config;
mod error;
mod geo;
mod health;
mod lookup;

#[derive(Clone, Debug)]
pub struct State {
    classifier: Arc<classifier::Classifier>,
    geo: Option<Arc<geo::GeoClient>>,
}

fn main() {
    let config: &'static Config = Box::leak(Box::new(
        Config::new().expect("error: failed to construct config"),
    ));

    // Sentry needs to be initialized outside of an async block.
    // See https://docs.sentry.io/platforms/rust.
    let _sentry_guard = config.sentry_url.as_ref().map(|dsn| {
        sentry::init(sentry::ClientOptions {
            dsn: Some(dsn.parse().expect("Invalid Sentry DSN")),
            release: sentry::release_name!(),
            environment: match env::var("ENVIRONMENT") {
                Ok(value) => Some(Cow::Owned(value)),
                Err(_) => Some(Cow::Borrowed("development")),
            },
            ..Default::default()
        })
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Corresponds to `#[tokio::main]`.
    // See https://docs.rs/tokio-macros/latest/src/tokio_macros/lib.rs.html#225.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("error: failed to initialize tokio runtime")
        .block_on(async {
            start_main_server(config).await;
        });
}

#[derive(OpenApi)]
#[openapi(info(
    title = "IP Lookup API",
    description = "Reports geolocation and ISP metadata for IP addresses."
))]
struct ApiDoc;

async fn start_main_server(config: &'static Config) {
    info!("Starting IP lookup API v{}", env!("CARGO_PKG_VERSION"));

    let geo = geo::GeoClient::new(config).map(Arc::new);
    if geo.is_none() {
        info!("IP-API key not configured, queries use the built-in classifier");
    }

    let state = State {
        classifier: Arc::new(classifier::Classifier::new()),
        geo,
    };

    let recorder_handle = setup_metrics_recorder();

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(lookup::route::lookup_self))
        .routes(routes!(lookup::route::lookup_address))
        .split_for_parts();

    let app = router
        .route("/metrics", get(move || ready(recorder_handle.render())))
        .route("/health", get(health::check))
        .route_layer(middleware::from_fn(track_metrics))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .merge(SwaggerUi::new("/docs").url("/docs/openapi.json", api))
        .fallback(error::not_found);

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .expect("error: failed to bind to port");
    info!(
        "IP lookup API running on http://{} (Press Ctrl+C to quit)",
        listener.local_addr().unwrap().to_string()
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("error: failed to initialize axum server");
}

fn setup_metrics_recorder() -> PrometheusHandle {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_requests_duration_seconds".to_string()),
            EXPONENTIAL_SECONDS,
        )
        .expect("error: failed to build prometheus recorder")
        .install_recorder()
        .expect("error: failed to install prometheus recorder")
}

async fn track_metrics(req: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];

    metrics::increment_counter!("http_requests_total", &labels);
    metrics::histogram!("http_requests_duration_seconds", latency, &labels);

    response
}
