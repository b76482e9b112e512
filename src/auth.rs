use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    authz::authorize,
    config::AppConfig,
    error::AppError,
    models::Identity,
    repository::RepositoryState,
    role::RoleLevel,
    session::SessionResolver,
};

/// AuthUser
///
/// The authenticated caller of a handler, with its role already mapped.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: RoleLevel,
    pub identity: Identity,
}

impl From<Identity> for AuthUser {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role_level(),
            identity,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Reuses the `Identity` the edge guard attached to the request. Routes mounted without
/// the guard fall back to resolving the session here.
///
/// Rejection: 401 when there is no session, 500 when the account store fails.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(AuthUser::from(identity.clone()));
        }

        let resolver = SessionResolver::new(RepositoryState::from_ref(state), AppConfig::from_ref(state));
        let identity = resolver.resolve(&parts.headers).await?;

        authorize(identity.as_ref(), Some(RoleLevel::Viewer)).into_result()?;
        identity.map(AuthUser::from).ok_or(AppError::Unauthenticated)
    }
}

/// AdminUser
///
/// An `AuthUser` whose role satisfies the admin tier. Admin handlers take this instead of
/// repeating the role check.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        authorize(Some(&user.identity), Some(RoleLevel::Admin)).into_result()?;
        Ok(AdminUser(user))
    }
}
