//! HTTP handlers, grouped by the access tier of the routes that mount them.
//!
//! Handlers never check roles themselves beyond taking `AuthUser`/`AdminUser`: the edge
//! guard has already applied the route table by the time a handler runs.

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

pub mod admin;
pub mod public;
pub mod user;

/// Parses an optional JSON body: an empty body yields `T::default()`.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> AppResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::validation(format!("Invalid JSON body: {}", e)))
}
