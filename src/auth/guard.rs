//! Request pipeline guards.
//!
//! Route protection is explicit: protected routers carry the `require_auth`
//! layer, admin routers additionally carry `require_admin`, and routes with
//! a static gender gate attach a [`GenderRestriction`] via
//! [`gender_restricted`]. Public routes simply carry no layer. The chain is
//! unauthenticated -> authenticated (claims in request extensions) ->
//! gender/role checked -> handler.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    auth::jwt::{Claims, JwtKeys},
    domain::{Gender, Role},
    error::ApiError,
    state::AppState,
};

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))
}

/// Authentication guard. Verifies the bearer token and stores the decoded
/// claims in request extensions for the guards and handlers behind it.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let token = bearer_token(req.headers())?;
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        ApiError::Unauthorized("Invalid or expired token".into())
    })?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Admin guard, layered behind `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("Missing authentication".into()))?;
    if claims.role != Role::Admin {
        return Err(ApiError::Forbidden("Admin access required".into()));
    }
    Ok(next.run(req).await)
}

/// Static gender gate attached to a route definition and interpreted at
/// dispatch time.
#[derive(Debug, Clone, Copy)]
pub struct GenderRestriction {
    pub allowed: &'static [Gender],
}

impl GenderRestriction {
    pub const fn new(allowed: &'static [Gender]) -> Self {
        Self { allowed }
    }
}

/// Gender guard, layered behind `require_auth`:
/// `route_layer(middleware::from_fn(move |req, next| gender_restricted(restriction, req, next)))`.
pub async fn gender_restricted(
    restriction: GenderRestriction,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("Missing authentication".into()))?;
    if !restriction.allowed.contains(&claims.gender) {
        warn!(user_id = %claims.sub, gender = ?claims.gender, "gender gate rejected");
        return Err(ApiError::Forbidden(
            "Your gender does not have access to this resource".into(),
        ));
    }
    Ok(next.run(req).await)
}

/// Extractor handing the verified claims to a handler. Only usable behind
/// `require_auth`.
pub struct CurrentUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("Missing authentication".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn whoami(CurrentUser(claims): CurrentUser) -> String {
        claims.sub.to_string()
    }

    fn protected_app(state: AppState, restriction: Option<GenderRestriction>) -> Router {
        let mut route = Router::new().route("/whoami", get(whoami));
        if let Some(r) = restriction {
            route = route.route_layer(middleware::from_fn(
                move |req: Request, next: Next| gender_restricted(r, req, next),
            ));
        }
        route
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .layer(middleware::from_fn(crate::error::error_envelope))
            .with_state(state)
    }

    fn token_for(state: &AppState, gender: Gender) -> (Uuid, String) {
        let keys = JwtKeys::from_ref(state);
        let id = Uuid::new_v4();
        let token = keys.sign(id, "a@x.com", gender, Role::User).unwrap();
        (id, token)
    }

    #[tokio::test]
    async fn missing_token_halts_with_unauthorized() {
        let app = protected_app(AppState::fake(), None);
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_halts_with_unauthorized() {
        let app = protected_app(AppState::fake(), None);
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_claims() {
        let state = AppState::fake();
        let (id, token) = token_for(&state, Gender::Male);
        let app = protected_app(state, None);
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = http_body_util::BodyExt::collect(res.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(body, id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn gender_gate_forbids_disallowed_gender() {
        let state = AppState::fake();
        let (_, token) = token_for(&state, Gender::Female);
        let app = protected_app(
            state,
            Some(GenderRestriction::new(&[Gender::Male])),
        );
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let body = http_body_util::BodyExt::collect(res.into_body())
            .await
            .unwrap()
            .to_bytes();
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["statusCode"], 403);
        assert_eq!(envelope["path"], "/whoami");
        assert_eq!(envelope["method"], "GET");
        assert_eq!(envelope["error"], "Forbidden");
    }

    #[tokio::test]
    async fn gender_gate_passes_allowed_gender() {
        let state = AppState::fake();
        let (_, token) = token_for(&state, Gender::Male);
        let app = protected_app(
            state,
            Some(GenderRestriction::new(&[Gender::Male])),
        );
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_guard_rejects_plain_user() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys
            .sign(Uuid::new_v4(), "u@x.com", Gender::Male, Role::User)
            .unwrap();
        let app = Router::new()
            .route("/admin-only", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(require_admin))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state);
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/admin-only")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
