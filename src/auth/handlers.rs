use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, HealthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        guard::CurrentUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    domain::Role,
    error::ApiError,
    state::AppState,
    users::repo::{NewUser, User},
    validate::{is_strong_password, is_valid_email, is_valid_phone, is_valid_skill_level},
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/health", post(health))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/refresh", post(refresh))
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), ApiError> {
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if !is_strong_password(&payload.password) {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters with upper/lower case and a digit".into(),
        ));
    }
    if payload.name.trim().len() < 2 {
        return Err(ApiError::Validation(
            "Name must be at least 2 characters long".into(),
        ));
    }
    if let Some(phone) = payload.phone.as_deref() {
        if !is_valid_phone(phone) {
            return Err(ApiError::Validation("Invalid phone number".into()));
        }
    }
    if let Some(level) = payload.skill_level.as_deref() {
        if !is_valid_skill_level(level) {
            return Err(ApiError::Validation("Invalid skill level".into()));
        }
    }
    Ok(())
}

fn auth_response(keys: &JwtKeys, user: &User) -> Result<AuthResponse, ApiError> {
    let access_token = keys.sign(user.id, &user.email, user.gender, user.role)?;
    Ok(AuthResponse {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        gender: user.gender,
        access_token,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    validate_registration(&payload)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict(format!(
            "User with email {} already exists",
            payload.email
        )));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            email: &payload.email,
            password_hash: &hash,
            name: payload.name.trim(),
            gender: payload.gender,
            role: Role::User,
            phone: payload.phone.as_deref(),
            skill_level: payload.skill_level.as_deref(),
        },
    )
    .await
    .map_err(|e| match &e {
        // Lost the pre-check race: the unique index is the arbiter.
        sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::Conflict(format!(
            "User with email {} already exists",
            payload.email
        )),
        _ => ApiError::from(e),
    })?;

    let keys = JwtKeys::from_ref(&state);
    let body = auth_response(&keys, &user)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Same message for unknown email and wrong password.
    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let body = auth_response(&keys, &user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(body))
}

/// Re-fetches the user so the new token carries current role/gender, and
/// fails if the account has disappeared since issuance.
#[instrument(skip(state, caller, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify(&payload.token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    let body = auth_response(&keys, &user)?;
    info!(user_id = %user.id, requested_by = %caller.sub, "token refreshed");
    Ok(Json(body))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Gender;

    #[test]
    fn registration_validation_rules() {
        let mut payload = RegisterRequest {
            email: "a@x.com".into(),
            password: "Abcdef12".into(),
            name: "A".into(),
            gender: Gender::Male,
            phone: None,
            skill_level: None,
        };
        // Single-letter name is rejected.
        assert!(validate_registration(&payload).is_err());

        payload.name = "Ana".into();
        assert!(validate_registration(&payload).is_ok());

        payload.password = "weak".into();
        assert!(validate_registration(&payload).is_err());

        payload.password = "Abcdef12".into();
        payload.email = "nope".into();
        assert!(validate_registration(&payload).is_err());
    }

    #[test]
    fn register_request_accepts_wire_gender() {
        let json = r#"{"email":"a@x.com","password":"Abcdef12","name":"A","gender":"MALE"}"#;
        let req: RegisterRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.gender, Gender::Male);
        assert!(req.phone.is_none());
    }

    #[test]
    fn auth_response_serializes_access_token_camel_case() {
        let body = AuthResponse {
            id: uuid::Uuid::new_v4(),
            email: "a@x.com".into(),
            name: "A".into(),
            gender: Gender::Female,
            access_token: "tok".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["accessToken"], "tok");
        assert_eq!(json["gender"], "FEMALE");
    }
}
