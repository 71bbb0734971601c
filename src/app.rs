use std::net::SocketAddr;

use axum::{http::header, http::HeaderValue, http::Method, middleware, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{self, guard},
    bookings, error, matches, payments, reviews,
    state::AppState,
    users, venues,
};

fn cors_layer(origin: &str) -> CorsLayer {
    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        Err(_) => CorsLayer::new().allow_origin(Any),
    }
}

pub fn build_app(state: AppState) -> Router {
    // Public surface: no auth guard at all.
    let public = Router::new()
        .merge(auth::public_router())
        .merge(payments::public_router());

    // Admin surface: auth guard plus role guard.
    let admin = Router::new()
        .merge(users::admin_router())
        .merge(venues::admin_router())
        .route_layer(middleware::from_fn(guard::require_admin));

    // Everything else requires a valid bearer token.
    let protected = Router::new()
        .merge(auth::protected_router())
        .merge(users::router())
        .merge(matches::router())
        .merge(venues::router())
        .merge(reviews::router())
        .merge(bookings::router())
        .merge(payments::protected_router())
        .nest("/admin", admin)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_auth,
        ));

    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .nest("/api", public.merge(protected))
        .with_state(state)
        .layer(middleware::from_fn(error::error_envelope))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
