use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mongodb::{bson::oid::ObjectId, Database};
use serde::{Deserialize, Serialize};

use configs::AppEnv;
use service::auth::{
    domain::{LoginInput, RegisterInput},
    repo::mongo::MongoAuthRepository,
    service::{AuthConfig, AuthService},
};

use crate::errors::JsonApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

/// Process-wide state handed to every handler: the store handle constructed
/// at startup, auth configuration and the deployment mode.
#[derive(Clone)]
pub struct ServerState {
    pub db: Database,
    pub auth: ServerAuthConfig,
    pub env: AppEnv,
}

/// Authenticated caller, injected into request extensions by [`require_auth`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub email: String,
}

#[derive(Serialize)]
pub struct RegisterOutput {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct MeOutput {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    uid: String,
    #[allow(dead_code)]
    exp: usize,
}

fn auth_service(state: &ServerState) -> AuthService<MongoAuthRepository> {
    let repo = Arc::new(MongoAuthRepository { db: state.db.clone() });
    AuthService::new(
        repo,
        AuthConfig {
            jwt_secret: Some(state.auth.jwt_secret.clone()),
            password_algorithm: "argon2".into(),
        },
    )
}

pub async fn register(
    State(state): State<ServerState>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<RegisterOutput>, JsonApiError> {
    models::user::validate_email(&input.email)?;
    models::user::validate_name(&input.name)?;
    let user = auth_service(&state).register(input).await?;
    Ok(Json(RegisterOutput { user_id: user.id.to_hex() }))
}

pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<LoginOutput>), JsonApiError> {
    let session = auth_service(&state).login(input).await?;
    let user = session.user;
    let token = session
        .token
        .ok_or_else(|| JsonApiError::internal("token generation failed"))?;

    let mut cookie = Cookie::new(AUTH_COOKIE, token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(state.env.is_production());
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);

    Ok((
        jar,
        Json(LoginOutput { user_id: user.id.to_hex(), email: user.email, name: user.name, token }),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<MeOutput>, JsonApiError> {
    let token = extract_token(&headers)
        .ok_or_else(|| JsonApiError::unauthorized("missing credentials"))?;
    let claims = decode_claims(&token, &state.auth.jwt_secret)
        .map_err(|_| JsonApiError::unauthorized("invalid or expired token"))?;
    let id = ObjectId::parse_str(&claims.uid)
        .map_err(|_| JsonApiError::unauthorized("malformed subject"))?;
    let user = models::user::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| JsonApiError::not_found("user"))?;
    Ok(Json(MeOutput { user_id: user.id.to_hex(), email: user.email, name: user.name }))
}

/// Guard for routes that require an authenticated caller. Missing
/// credentials are a 400, invalid or expired ones a 401; a malformed
/// `Authorization` header counts as invalid.
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();

    if let Some(h) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if !h.starts_with("Bearer ") {
            tracing::warn!(path = %path, "invalid Authorization format (expect Bearer)");
            return Err(JsonApiError::unauthorized("expected Bearer token"));
        }
    }

    let Some(token) = extract_token(req.headers()) else {
        tracing::warn!(path = %path, "missing Authorization header and auth_token cookie");
        return Err(JsonApiError::new(
            StatusCode::BAD_REQUEST,
            "Missing Credentials",
            Some("provide a Bearer token or auth_token cookie".into()),
        ));
    };

    match decode_claims(&token, &state.auth.jwt_secret) {
        Ok(claims) => {
            let id = ObjectId::parse_str(&claims.uid)
                .map_err(|_| JsonApiError::unauthorized("malformed subject"))?;
            req.extensions_mut().insert(CurrentUser { id, email: claims.sub });
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "token validation failed");
            Err(JsonApiError::unauthorized("invalid or expired token"))
        }
    }
}

/// Bearer token from `Authorization`, falling back to the `auth_token`
/// cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(h) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return h.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    for part in cookie_header.split(';') {
        if let Some(rest) = part.trim().strip_prefix("auth_token=") {
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    None
}

fn decode_claims(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    Ok(decode::<Claims>(token, &key, &validation)?.claims)
}
