use axum::extract::State;

use crate::{
    AppState,
    backend::BackendError,
    error::{AppError, AppResult},
    extract::Json,
    models::{NewUser, RegisterResponse, RegisterUserRequest, RegisteredUser, blank_to_none},
    session::normalize_email,
};

/// register_user
///
/// [Public Route] Signs the user up with Supabase Auth, then mirrors the account locally:
/// an `auth_users` row with the default role, a profile and a free subscription.
///
/// A Supabase rejection (existing email, weak password) is a 400 carrying Supabase's
/// message.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Missing credentials or rejected by Supabase")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<Json<RegisterResponse>> {
    let (Some(email), Some(password)) = (
        blank_to_none(payload.email).map(|e| normalize_email(&e)),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Email and password required"));
    };

    let supabase_id = state
        .backend
        .sign_up(&email, &password)
        .await
        .map_err(|e| match e {
            BackendError::Rejected { message, .. } => AppError::Validation(message),
            other => AppError::Backend(other),
        })?;

    let name = blank_to_none(payload.name);
    let nickname = blank_to_none(payload.nickname);
    let id = state
        .repo
        .create_user(NewUser {
            supabase_id,
            email: email.clone(),
            name: name.clone(),
            nickname: nickname.clone(),
        })
        .await?;

    tracing::info!(user_id = %id, "user registered");

    Ok(Json(RegisterResponse {
        success: true,
        user: RegisteredUser {
            id,
            email,
            name,
            nickname,
        },
    }))
}
