use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    errors::ApiError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the HS256 access tokens issued at register/login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    /// Role at issue time. Informational only; the extractor reloads the role from the store.
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

/// AuthToken
///
/// Body returned by register and login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthToken {
    pub user: User,
    pub access_token: String,
    pub token_type: String,
    /// Seconds until `access_token` expires.
    pub expires_in: u64,
}

/// Signs an access token for `user` valid for `config.jwt_ttl_secs`.
pub fn issue_token(user: &User, config: &AppConfig) -> Result<AuthToken, ApiError> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user.id,
        role: user.role.clone(),
        iat: now,
        exp: now + config.jwt_ttl_secs as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

    Ok(AuthToken {
        user: user.clone(),
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: config.jwt_ttl_secs,
    })
}

/// Argon2id PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// False for a wrong password or an unparseable hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// AuthUser Extractor Result
///
/// Resolved identity of an authenticated request. The role is the one currently stored for
/// the user, not the one baked into the token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role.as_str()
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Role guard: 403 unless the caller holds one of `roles`.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.iter().any(|r| self.has_role(*r)) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Resolves the caller from the request headers.
///
/// `Ok(None)` means no credentials were presented at all.
async fn resolve(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<AuthUser>, ApiError> {
    // Local-only bypass: `x-user-id` naming an existing user.
    if config.env == Env::Local {
        let bypass_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok());
        if let Some(user_id) = bypass_id {
            if let Some(user) = repo.find_user(user_id).await? {
                return Ok(Some(AuthUser {
                    id: user.id,
                    role: user.role,
                }));
            }
        }
    }

    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token.trim(),
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "rejected access token");
        ApiError::Unauthorized
    })?;

    // Users deleted after the token was issued are rejected.
    let user = repo
        .find_user(token_data.claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Some(AuthUser {
        id: user.id,
        role: user.role,
    }))
}

/// AuthUser Extractor Implementation
///
/// Usable as a handler argument on any route; rejects with 401 when no valid credentials
/// are presented.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        resolve(parts, &repo, &config)
            .await?
            .ok_or(ApiError::Unauthorized)
    }
}

/// `Option<AuthUser>` for public routes that record the caller when one is present.
/// Invalid credentials are treated as anonymous.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        match resolve(parts, &repo, &config).await {
            Ok(user) => Ok(user),
            Err(ApiError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
