use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod audit;
mod auth;
mod config;
mod context;
mod engine;
mod error;
mod extract;
mod judge;
mod metrics;
mod middleware;
mod prompts;
mod routes;
mod state;

use crate::judge::{HttpJudge, Judge};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vigil Oversight API",
        version = "0.1.0",
        description = "Approval-decision service sitting between an automation pipeline and a \
                       social platform's write actions. Every proposed reply, DM, and post is \
                       checked against deterministic rules and a judgment model, and every \
                       decision is audited."
    ),
    paths(
        routes::health::health_check,
        routes::comment::approve_comment_reply,
        routes::dm::approve_dm_reply,
        routes::post::approve_post,
    ),
    components(schemas(
        routes::health::HealthResponse,
        vigil_core::error::ApiError,
        vigil_core::proposal::CommentReplyProposal,
        vigil_core::proposal::DmReplyProposal,
        vigil_core::proposal::PostProposal,
        vigil_core::proposal::CustomerHistory,
        vigil_core::proposal::AssetDescriptor,
        vigil_core::proposal::ProposalKind,
        vigil_core::decision::DecisionResponse,
        vigil_core::decision::Modifications,
        vigil_core::decision::AuditData,
        vigil_core::escalation::Escalation,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            utoipa::openapi::security::SecurityScheme::ApiKey(
                utoipa::openapi::security::ApiKey::Header(
                    utoipa::openapi::security::ApiKeyValue::new("x-api-key"),
                ),
            ),
        );
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::Config::from_env();

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations (audit_log is the only entity this service owns)
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let judge: Arc<dyn Judge> = Arc::new(HttpJudge::new(
        &config.judge_url,
        &config.judge_model,
        config.judge_timeout,
    ));

    let app_state = state::AppState {
        db: pool.clone(),
        engine: Arc::new(engine::DecisionEngine::new(
            judge.clone(),
            config.judge_max_concurrent,
            config.judge_timeout,
            config.judge_model.clone(),
            config.rules.clone(),
        )),
        gatherer: Arc::new(context::ContextGatherer::new(pool.clone())),
        audit: Arc::new(audit::AuditLogger::new(pool)),
        judge,
        metrics: Arc::new(metrics::Metrics::new()),
        api_key: config.api_key.clone(),
        model: config.judge_model.clone(),
    };

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::comment::router().layer(middleware::rate_limit::approvals_layer()))
        .merge(routes::dm::router().layer(middleware::rate_limit::approvals_layer()))
        .merge(routes::post::router().layer(middleware::rate_limit::approvals_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.request_timeout)),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Vigil oversight API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
