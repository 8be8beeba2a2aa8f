use axum::{
    extract::{FromRef, Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            total_pages, AuthResponse, ForgotPasswordRequest, LoginRequest, ProfileResponse,
            PublicUser, RegisterRequest, ResetPasswordRequest, SearchParams, SearchResponse,
            StatusResponse, UpdateProfileRequest,
        },
        extractors::AuthUser,
        password::{hash_password_async, verify_password_async, MIN_PASSWORD_LEN},
        jwt::SessionKeys,
        repo::{is_unique_violation, ProfileChanges, SearchField, User},
        reset::ResetKeys,
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const WEAK_PASSWORD: &str = "Password must be at least 8 characters long";
const RESET_REQUESTED: &str = "If that email is registered, a reset link has been sent";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(get_profile))
        .route("/auth/updateProfile", put(update_profile))
        .route("/auth/search", get(search))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:id/:token", post(reset_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::Validation("Invalid email format".into()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(WEAK_PASSWORD.into()));
    }

    let hash = hash_password_async(payload.password).await?;

    // Unique index on email decides the winner of concurrent registrations.
    let user = User::create(&state.db, payload.name.trim(), &email, &hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(%email, "email already registered");
                ApiError::Conflict("User already exists".into())
            } else {
                ApiError::Database(e)
            }
        })?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id, Some(user.email.clone()))?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
        message: "Registration successful, you can login now!".into(),
    }))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);

    // Unknown email and wrong password answer identically.
    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(%email, "login unknown email");
            return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
        }
    };

    let ok = verify_password_async(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id, Some(user.email.clone()))?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
        message: "Login successful".into(),
    }))
}

#[instrument(skip(state, claims))]
async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(ProfileResponse { user }))
}

#[instrument(skip(state, claims, payload))]
async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let email = match payload.email {
        Some(raw) => {
            let email = normalize_email(&raw);
            if !is_valid_email(&email) {
                return Err(ApiError::Validation("Invalid email format".into()));
            }
            Some(email)
        }
        None => None,
    };

    // A password in the payload is plaintext and must be re-hashed, never
    // written through as-is.
    let password_hash = match payload.password {
        Some(plain) => {
            if plain.chars().count() < MIN_PASSWORD_LEN {
                return Err(ApiError::Validation(WEAK_PASSWORD.into()));
            }
            Some(hash_password_async(plain).await?)
        }
        None => None,
    };

    let changes = ProfileChanges {
        name: payload.name,
        email,
        phone: payload.phone,
        department: payload.department,
        campus: payload.campus,
        password_hash,
    };

    let user = User::update_by_id(&state.db, claims.sub, &changes)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Email already in use".into())
            } else {
                ApiError::Database(e)
            }
        })?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(ProfileResponse { user }))
}

#[instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let field = params
        .category
        .as_deref()
        .and_then(SearchField::from_category)
        .ok_or_else(|| ApiError::Validation("Unsupported search category".into()))?;

    let query = params.query.as_deref().unwrap_or("");
    let page = params.page();
    let limit = params.limit();
    let offset = params.offset();

    let results = User::search_page(&state.db, field, query, limit, offset).await?;
    let total_count = User::search_count(&state.db, field, query).await?;

    Ok(Json(SearchResponse {
        results,
        total_count,
        total_pages: total_pages(total_count, limit),
        current_page: page,
    }))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let email = normalize_email(&payload.email);

    // Same response whether or not the account exists.
    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            info!("reset requested for unknown email");
            return Ok(Json(StatusResponse {
                status: RESET_REQUESTED.into(),
            }));
        }
    };

    let keys = ResetKeys::from_ref(&state);
    let token = keys.issue(user.id)?;
    let link = format!(
        "{}/reset-password/{}/{}",
        state.config.reset.link_base, user.id, token
    );

    // A failed send must not masquerade as success; the user would wait for
    // a mail that never comes.
    state
        .mailer
        .send(&user.email, "Reset Password Link", &link)
        .await
        .map_err(ApiError::Upstream)?;

    info!(user_id = %user.id, "reset link sent");
    Ok(Json(StatusResponse {
        status: RESET_REQUESTED.into(),
    }))
}

#[instrument(skip(state, token, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Path((id, token)): Path<(Uuid, String)>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<StatusResponse>> {
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(WEAK_PASSWORD.into()));
    }

    let keys = ResetKeys::from_ref(&state);
    keys.verify(&token, id).map_err(|e| {
        warn!(user_id = %id, error = %e, "reset token rejected");
        ApiError::Auth("Invalid or expired reset token".into())
    })?;

    let hash = hash_password_async(payload.password).await?;
    User::set_password_hash(&state.db, id, &hash)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %id, "password reset completed");
    Ok(Json(StatusResponse {
        status: "Success".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_basic_shape() {
        assert!(is_valid_email("user@example.edu"));
        assert!(is_valid_email("first.last@sub.example.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn normalization_makes_duplicates_collide() {
        assert_eq!(normalize_email("A@x.com"), normalize_email("a@x.com"));
        assert_eq!(normalize_email("  USER@Example.EDU  "), "user@example.edu");
    }

    #[test]
    fn login_failures_are_indistinguishable() {
        let unknown_email = ApiError::Auth(INVALID_CREDENTIALS.into());
        let wrong_password = ApiError::Auth(INVALID_CREDENTIALS.into());
        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
    }

    #[test]
    fn auth_response_serializes_token_and_user() {
        let res = AuthResponse {
            token: "ey.fake.token".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                name: "Alem T.".into(),
                email: "alem@example.edu".into(),
            },
            message: "Login successful".into(),
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("ey.fake.token"));
        assert!(json.contains("alem@example.edu"));
    }
}
