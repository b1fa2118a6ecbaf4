use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::http::Method;
use axum::{
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use samasya_backend::config::Config;
use samasya_backend::db::{
    issue_repository::IssueRepository, postgres_issue_repository::PostgresIssueRepository,
    postgres_user_repository::PostgresUserRepository, user_repository::UserRepository,
};
use samasya_backend::responses::JsonResponse;
use samasya_backend::routes::auth::{elevate_to_authority, verify_authority_code};
use samasya_backend::routes::issues::{
    add_comment, authority_dashboard, create_issue, delete_issue, get_issue, list_comments,
    list_issues, toggle_like, toggle_volunteer, update_issue, update_issue_status,
};
use samasya_backend::routes::profile::{get_profile, update_area};
use samasya_backend::services::media_storage::{CloudinaryMediaStorage, MediaStorage};
use samasya_backend::utils::jwt::TokenKeys;
use samasya_backend::AppState;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        // Default: 200ms/token (~5 req/sec)
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        // Default: allow short bursts while feeds poll
        .unwrap_or(20);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Background task to cleanup old rate-limiter IPs
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let config = Arc::new(Config::from_env());

    let token_keys = Arc::new(
        TokenKeys::from_env(&config.jwt_issuer, &config.jwt_audience)
            .expect("identity provider JWT secret must be usable"),
    );

    let pg_pool = establish_connection(&config.database_url).await;
    let user_repo = Arc::new(PostgresUserRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn UserRepository>;
    let issue_repo = Arc::new(PostgresIssueRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn IssueRepository>;

    let http_client = Client::new();
    let media = Arc::new(CloudinaryMediaStorage::new(
        http_client.clone(),
        config.media.clone(),
    )) as Arc<dyn MediaStorage>;
    if config.media.is_none() {
        info!("media storage not configured, issues will be created without photos");
    }

    let state = AppState {
        users: user_repo,
        issues: issue_repo,
        media,
        config: config.clone(),
        token_keys,
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let issue_routes = Router::new()
        .route("/", post(create_issue).get(list_issues))
        .route("/authority", get(authority_dashboard))
        .route(
            "/{issue_id}",
            get(get_issue).put(update_issue).delete(delete_issue),
        )
        .route("/{issue_id}/like", post(toggle_like))
        .route("/{issue_id}/volunteer", post(toggle_volunteer))
        .route("/{issue_id}/status", patch(update_issue_status))
        .route(
            "/{issue_id}/comments",
            get(list_comments).post(add_comment),
        );

    let user_routes = Router::new()
        .route("/profile", get(get_profile))
        .route("/area", patch(update_area));

    let auth_routes = Router::new()
        .route("/verify-authority-code", post(verify_authority_code))
        .route("/elevate", post(elevate_to_authority));

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/issues", issue_routes)
        .nest("/api/user", user_routes)
        .nest("/api/auth", auth_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: governor_conf.clone(),
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    let listener = TcpListener::bind(addr).await.unwrap();
    println!("Running at http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Hello, Samasya!").into_response()
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("Successfully connected to the database");
    pool
}
