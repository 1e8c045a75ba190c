use anyhow::Context;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, HeaderName, HeaderValue, Method, Request},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn, Span};

use pm_api::{AppState, AuthGate};
use pm_core::{AuthService, SessionAuthority, VolatileSessionStore};
use pm_infrastructure::{run_migrations, CandidateConnector, PgSessionRepository, PgUserRepository};
use pm_security::TokenCodec;
use pm_shared::config::{AppConfig, AppSettings};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Initialize telemetry; the guard flushes the file writer on drop
    let _log_guard = pm_shared::telemetry::init_telemetry(&config.log)?;

    info!("Property manager server starting ({})", config.app.env);
    if config.session.bypass_db_session {
        warn!("BYPASS_DB_SESSION is on: revoked and expired sessions are NOT rejected");
    }

    // Durable store candidates
    let connector = Arc::new(CandidateConnector::from_settings(&config.database)?);
    info!("Session database candidates: {:?}", connector.labels());

    if config.database.run_migrations {
        if let Err(e) = run_migrations(&connector).await {
            warn!("Migrations not applied, continuing in fallback mode: {:#}", e);
        }
    }

    // Wire services
    let sessions = Arc::new(
        SessionAuthority::new(
            Arc::new(PgSessionRepository::new(connector.clone(), config.session.window())),
            Arc::new(VolatileSessionStore::new()),
            config.session.bypass_db_session,
        )
        .with_store_timeout(config.database.operation_timeout()),
    );
    let tokens = Arc::new(TokenCodec::from_settings(&config.jwt)?);
    let auth = Arc::new(AuthService::new(
        Arc::new(PgUserRepository::new(connector)),
        sessions.clone(),
        tokens.clone(),
        config.jwt.access_token_ttl(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        auth,
        gate: AuthGate::new(tokens, sessions),
    };

    let app = with_layers(pm_api::router(state), &config.app)?;

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn with_layers(router: Router, settings: &AppSettings) -> anyhow::Result<Router> {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let origins = settings
        .cors_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("invalid app.cors_origins entry")?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([
            HeaderName::from_static(pm_shared::constants::ERROR_CODE_HEADER),
            request_id.clone(),
        ]);

    Ok(router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(cors),
    ))
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
