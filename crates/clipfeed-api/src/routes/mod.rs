//! Router assembly and the request-scoped extractors/middleware every
//! handler module shares, grounded on the teacher's `agent::api::mod`
//! (`api_v1_router` + `build_router`, the `authorize` middleware attaching
//! verified claims, and the CORS layer built from a configured origin
//! list).

mod admin;
mod auth;
mod clips;
mod collections;
mod cookies;
mod feed;
mod filters;
mod ingest;
mod internal;
mod jobs;
mod scout;
mod search;
mod topics;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use clipfeed_models::Id;

use crate::error::ApiError;
use crate::state::App;

/// The authenticated caller of a route that requires a signed bearer
/// token (§6). Rejects with 401 on a missing, malformed, or expired
/// token.
pub struct AuthUser(pub Id);

/// The caller of a route where auth is optional (`GET /api/feed`, §6):
/// present when a valid bearer token was sent, `None` when none was.
/// A token that *was* sent but fails to verify still rejects with 401 —
/// a client presenting a credential is trusted to want to know it was
/// rejected, rather than being silently downgraded to anonymous.
pub struct OptionalAuthUser(pub Option<Id>);

/// The authenticated operator of the admin surface (§6): a valid bearer
/// token whose claims additionally carry `admin: true`.
pub struct AdminUser(pub Id);

/// The internal worker's shared-secret credential (§6's
/// `/api/internal/*` routes), verified in constant time against
/// [`crate::config::Config::worker_secret`].
pub struct WorkerAuth;

#[axum::async_trait]
impl axum::extract::FromRequestParts<Arc<App>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<App>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(bearer) = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::unauthorized("missing or malformed authorization header"))?;
        let claims = crate::auth::verify_token(&state.config.token_secret, bearer.token())?;
        Ok(AuthUser(claims.user_id))
    }
}

#[axum::async_trait]
impl axum::extract::FromRequestParts<Arc<App>> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<App>,
    ) -> Result<Self, Self::Rejection> {
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(bearer)) => {
                let claims = crate::auth::verify_token(&state.config.token_secret, bearer.token())?;
                Ok(OptionalAuthUser(Some(claims.user_id)))
            }
            Err(_) => Ok(OptionalAuthUser(None)),
        }
    }
}

#[axum::async_trait]
impl axum::extract::FromRequestParts<Arc<App>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<App>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(bearer) = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::unauthorized("missing or malformed authorization header"))?;
        let claims = crate::auth::verify_token(&state.config.token_secret, bearer.token())?;
        if !claims.admin {
            return Err(ApiError::unauthorized("admin credentials required"));
        }
        Ok(AdminUser(claims.user_id))
    }
}

#[axum::async_trait]
impl axum::extract::FromRequestParts<Arc<App>> for WorkerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<App>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(bearer) = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::unauthorized("missing or malformed authorization header"))?;
        if !crate::auth::verify_worker_secret(&state.config.worker_secret, bearer.token()) {
            return Err(ApiError::unauthorized("invalid worker credentials"));
        }
        Ok(WorkerAuth)
    }
}

pub fn build_router(app: Arc<App>) -> Router<()> {
    let allow_origin = app.config.allow_origin.clone();

    let cors = if allow_origin.is_empty() {
        tower_http::cors::CorsLayer::new()
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_origin(tower_http::cors::AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> = allow_origin
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        tower_http::cors::CorsLayer::new()
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_origin(tower_http::cors::AllowOrigin::list(origins))
            .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
    };

    let internal_router = Router::new()
        .route("/internal/jobs/claim", post(internal::claim_job))
        .route("/internal/jobs/:id", put(internal::update_job))
        .route("/internal/jobs/reclaim", post(internal::reclaim_jobs))
        .route("/internal/sources/:id/cookie", get(internal::source_cookie))
        .route("/internal/clips", post(internal::create_clip))
        .route("/internal/topics/resolve", post(internal::resolve_topic))
        .route("/internal/scores/update", post(internal::update_scores));

    let api_router = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/feed", get(feed::get_feed))
        .route("/clips/:id", get(clips::get_clip))
        .route("/clips/:id/stream", get(clips::stream_clip))
        .route("/clips/:id/similar", get(clips::similar_clips))
        .route("/clips/:id/interact", post(clips::interact))
        .route("/clips/:id/save", post(clips::save_clip))
        .route("/clips/:id/save", delete(clips::unsave_clip))
        .route("/search", get(search::search))
        .route("/ingest", post(ingest::submit))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/jobs/:id", delete(jobs::dismiss_job))
        .route("/jobs/:id/cancel", post(jobs::cancel_job))
        .route("/jobs/:id/retry", post(jobs::retry_job))
        .route("/collections", get(collections::list_collections))
        .route("/collections", post(collections::create_collection))
        .route("/collections/:id", get(collections::get_collection))
        .route("/collections/:id", delete(collections::delete_collection))
        .route("/collections/:id/clips", post(collections::add_clip))
        .route("/collections/:id/clips/:clip_id", delete(collections::remove_clip))
        .route("/me/cookies/:platform", put(cookies::upsert_cookie))
        .route("/me/cookies/:platform", delete(cookies::delete_cookie))
        .route("/scout/sources", get(scout::list_sources))
        .route("/scout/sources", post(scout::create_source))
        .route("/scout/sources/:id", delete(scout::delete_source))
        .route("/scout/candidates/:id/approve", post(scout::approve))
        .route("/scout/profile", get(scout::profile))
        .route("/filters", get(filters::list_filters))
        .route("/filters", post(filters::create_filter))
        .route("/filters/:id", delete(filters::delete_filter))
        .route("/topics", get(topics::list_topics))
        .route("/topics/tree", get(topics::topic_tree))
        .route("/admin/login", post(admin::login))
        .route("/admin/status", get(admin::status))
        .merge(internal_router)
        .route_layer(middleware::from_fn_with_state(app.clone(), rate_limit));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_router)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .with_state(app)
}

async fn healthz(State(app): State<Arc<App>>) -> Response {
    match app.handle.health_check().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response()
        }
    }
}

/// Per-IP token-bucket enforcement (§4.3): resolves the caller's IP via
/// `clipfeed_security::extract_client_ip` (trusting `X-Real-IP`/
/// `X-Forwarded-For` only from a peer inside `app.trusted_cidrs`), then
/// consults `app.rate_limiter`.
async fn rate_limit(
    State(app): State<Arc<App>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let x_real_ip = headers.get("x-real-ip").and_then(|v| v.to_str().ok());
    let x_forwarded_for = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());

    let ip = clipfeed_security::extract_client_ip(&peer.to_string(), x_real_ip, x_forwarded_for, &app.trusted_cidrs);

    if !app.rate_limiter.allow(&ip) {
        return ApiError::rate_limited().into_response();
    }

    next.run(request).await
}
