/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with every route group and the middleware stack.
///
/// # Example
///
/// ```no_run
/// use studiobook_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = studiobook_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{set_expose_internal_errors, ApiError},
    middleware::{
        rate_limit::{rate_limit_layer, RateLimiter},
        security::SecurityHeadersLayer,
    },
    routes,
};
use axum::{
    error_handling::HandleErrorLayer,
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    BoxError, Router,
};
use sqlx::PgPool;
use std::{any::Any, sync::Arc, time::Duration};
use studiobook_shared::auth::{
    jwt,
    middleware::{bearer_token, AuthContext},
};
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Redis-backed request counters; `None` disables rate limiting
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /api
/// ├── GET /api                    # Documentation payload
/// ├── GET /api/health             # Liveness
/// ├── GET /api/health/db          # Store check + counts
/// ├── /api/{version}/...          # Resource routes (versioned)
/// └── /api/...                    # Same resource routes, unversioned
///     ├── /auth/{register,login,refresh,profile,logout}
///     ├── /studios[/:id]
///     ├── /bookings[/:id[/payment]]
///     ├── /equipment[/:id]
///     └── /notifications[/:id/read]
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Panic catching (500 envelope)
/// 2. Security headers
/// 3. CORS
/// 4. Request tracing
/// 5. Compression
/// 6. Request timeout (408 envelope)
/// 7. Rate limiting
/// 8. Bearer authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    set_expose_internal_errors(state.config.api.environment.is_development());

    let resources = resource_routes(&state);
    let version_prefix = format!("/api/{}", state.config.api.version);

    let cors = cors_layer(&state.config.api.cors_origins);
    let timeout = Duration::from_secs(state.config.api.request_timeout_secs);
    let production = state.config.is_production();

    let router = Router::new()
        .route("/api", get(routes::docs::api_docs))
        .route("/api/health", get(routes::health::health_check))
        .route("/api/health/db", get(routes::health::database_health))
        .nest(&version_prefix, resources.clone())
        .nest("/api", resources)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), rate_limit_layer));

    with_request_timeout(router, timeout)
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Resource routes, mounted under both the versioned and plain prefix
fn resource_routes(state: &AppState) -> Router<AppState> {
    let auth = from_fn_with_state(state.clone(), jwt_auth_layer);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .merge(
            Router::new()
                .route(
                    "/profile",
                    get(routes::auth::get_profile)
                        .put(routes::auth::update_profile)
                        .delete(routes::auth::delete_profile),
                )
                .route("/logout", post(routes::auth::logout))
                .route_layer(auth.clone()),
        );

    let studio_routes = Router::new()
        .route("/", get(routes::studios::list_studios))
        .route("/:id", get(routes::studios::get_studio))
        .merge(
            Router::new()
                .route("/", post(routes::studios::create_studio))
                .route(
                    "/:id",
                    put(routes::studios::update_studio).delete(routes::studios::delete_studio),
                )
                .route_layer(auth.clone()),
        );

    let booking_routes = Router::new()
        .route(
            "/",
            get(routes::bookings::list_bookings).post(routes::bookings::create_booking),
        )
        .route(
            "/:id",
            get(routes::bookings::get_booking).put(routes::bookings::update_booking),
        )
        .route(
            "/:id/payment",
            post(routes::bookings::record_booking_payment)
                .put(routes::bookings::update_booking_payment),
        )
        .route_layer(auth.clone());

    let equipment_routes = Router::new()
        .route("/", get(routes::equipment::list_equipment))
        .route("/:id", get(routes::equipment::get_equipment))
        .merge(
            Router::new()
                .route("/", post(routes::equipment::create_equipment))
                .route(
                    "/:id",
                    put(routes::equipment::update_equipment)
                        .delete(routes::equipment::delete_equipment),
                )
                .route_layer(auth.clone()),
        );

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/:id/read", post(routes::notifications::mark_notification_read))
        .route_layer(auth);

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/studios", studio_routes)
        .nest("/bookings", booking_routes)
        .nest("/equipment", equipment_routes)
        .nest("/notifications", notification_routes)
}

/// Permissive when the origin list contains `*`, otherwise an allow-list
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer access token and injects an [`AuthContext`] into
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = {
        let token = bearer_token(req.headers())?;
        jwt::validate_access_token(token, state.jwt_secret())?
    };

    req.extensions_mut().insert(AuthContext::from_claims(&claims));

    Ok(next.run(req).await)
}

/// Bounds every request by `timeout`, answering overruns with the error envelope
fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .timeout(timeout),
    )
}

async fn handle_timeout_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::RequestTimeout("Request timed out".to_string())
    } else {
        ApiError::Internal(format!("Unhandled middleware error: {err}"))
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    };

    ApiError::Internal(format!("Request handler panicked: {detail}")).into_response()
}
