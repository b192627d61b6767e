use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{self, AuthToken, AuthUser},
    errors::{ApiError, ApiResponse, ApiResult},
    extractors::ApiJson,
    models::{NewUser, User},
    validation::{LoginPayload, RegisterPayload, validate_login, validate_registration},
};

/// register
///
/// [Public Route] Creates an account and returns an access token for it.
/// `admin` cannot be self-assigned.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Registered", body = AuthToken),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterPayload>,
) -> ApiResult<impl IntoResponse> {
    let registration = validate_registration(&payload)?;

    if state
        .repo
        .find_credentials_by_email(&registration.email)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("User already exists"));
    }

    let user = state
        .repo
        .create_user(NewUser {
            name: registration.name,
            email: registration.email,
            password_hash: auth::hash_password(&registration.password)?,
            role: registration.role,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    let token = auth::issue_token(&user, &state.config)?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User registered successfully", token),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for an access token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Logged in", body = AuthToken),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> ApiResult<ApiResponse<AuthToken>> {
    let (email, password) = validate_login(&payload)?;

    let credentials = state
        .repo
        .find_credentials_by_email(&email)
        .await?
        .filter(|c| auth::verify_password(&password, &c.password_hash))
        .ok_or(ApiError::InvalidCredentials)?;

    let user = User::from(credentials);
    let token = auth::issue_token(&user, &state.config)?;
    Ok(ApiResponse::ok("Login successful", token))
}

/// get_me
///
/// [Authenticated Route] Profile of the caller.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<User>> {
    let user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::ok("User profile retrieved successfully", user))
}
