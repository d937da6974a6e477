use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod planning;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planflow_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let state = AppState {
        db,
        config: config.clone(),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh));

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        // Yearly goals
        .route("/api/goals", get(handlers::yearly_goals::list_yearly_goals))
        .route("/api/goals", post(handlers::yearly_goals::create_yearly_goal))
        .route("/api/goals/:id", get(handlers::yearly_goals::get_yearly_goal))
        .route("/api/goals/:id", put(handlers::yearly_goals::update_yearly_goal))
        .route("/api/goals/:id", delete(handlers::yearly_goals::delete_yearly_goal))
        .route(
            "/api/goals/:id/progress",
            patch(handlers::yearly_goals::update_progress),
        )
        // Monthly plans
        .route(
            "/api/monthly-plans",
            get(handlers::monthly_plans::list_monthly_plans),
        )
        .route(
            "/api/monthly-plans",
            post(handlers::monthly_plans::create_monthly_plan),
        )
        .route(
            "/api/monthly-plans/:id",
            get(handlers::monthly_plans::get_monthly_plan),
        )
        .route(
            "/api/monthly-plans/:id",
            put(handlers::monthly_plans::update_monthly_plan),
        )
        .route(
            "/api/monthly-plans/:id",
            delete(handlers::monthly_plans::delete_monthly_plan),
        )
        .route(
            "/api/monthly-plans/:id/tasks",
            post(handlers::monthly_plans::create_monthly_task),
        )
        .route(
            "/api/monthly-tasks/:id",
            put(handlers::monthly_plans::update_monthly_task),
        )
        .route(
            "/api/monthly-tasks/:id",
            delete(handlers::monthly_plans::delete_monthly_task),
        )
        .route(
            "/api/monthly-tasks/:id/status",
            patch(handlers::monthly_plans::update_monthly_task_status),
        )
        // Daily plans
        .route("/api/daily-plans", get(handlers::daily_plans::list_daily_plans))
        .route("/api/daily-plans", post(handlers::daily_plans::create_daily_plan))
        .route(
            "/api/daily-plans/schedule-task",
            post(handlers::daily_plans::schedule_task),
        )
        .route("/api/daily-plans/:id", get(handlers::daily_plans::get_daily_plan))
        .route("/api/daily-plans/:id", put(handlers::daily_plans::update_daily_plan))
        .route(
            "/api/daily-plans/:id",
            delete(handlers::daily_plans::delete_daily_plan),
        )
        .route(
            "/api/daily-plans/:id/tasks",
            post(handlers::daily_plans::create_daily_task),
        )
        .route(
            "/api/daily-tasks/:id",
            put(handlers::daily_plans::update_daily_task),
        )
        .route(
            "/api/daily-tasks/:id",
            delete(handlers::daily_plans::delete_daily_task),
        )
        .route(
            "/api/daily-tasks/:id/status",
            patch(handlers::daily_plans::update_daily_task_status),
        )
        // Daily summaries
        .route(
            "/api/daily-plans/:id/summary",
            get(handlers::summaries::get_summary),
        )
        .route(
            "/api/daily-plans/:id/summary",
            post(handlers::summaries::create_summary),
        )
        .route(
            "/api/daily-plans/:id/summary",
            put(handlers::summaries::update_summary),
        )
        .route(
            "/api/daily-plans/:id/summary",
            delete(handlers::summaries::delete_summary),
        )
        // Analytics
        .route(
            "/api/analytics/dashboard",
            get(handlers::analytics::get_dashboard_stats),
        )
        .route(
            "/api/analytics/yearly/:year",
            get(handlers::analytics::get_yearly_stats),
        )
        .route(
            "/api/analytics/monthly/:year/:month",
            get(handlers::analytics::get_monthly_stats),
        )
        .route(
            "/api/analytics/completion-rate",
            get(handlers::analytics::get_completion_rate_trend),
        )
        .route(
            "/api/analytics/heatmap",
            get(handlers::analytics::get_heatmap),
        )
        // Auth actions requiring a session
        .route("/api/auth/logout", post(handlers::auth::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
