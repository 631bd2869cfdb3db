// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bearer-token authentication.
//!
//! [`require_auth_layer`] hashes the presented token, looks up its owner and
//! stores a [`CurrentUser`] in request extensions. Handlers read it back with
//! [`RequireAuth`].

use axum::{
	extract::{FromRequestParts, Request, State},
	http::request::Parts,
	middleware::Next,
	response::Response,
};
use chrono::Utc;
use quill_server_auth::{extract_bearer_token, hash_token, CurrentUser};

use crate::{api::AppState, error::ServerError};

/// Reject requests without a valid API token.
pub async fn require_auth_layer(
	State(state): State<AppState>,
	mut req: Request,
	next: Next,
) -> Result<Response, ServerError> {
	let Some(token) = extract_bearer_token(req.headers()) else {
		tracing::debug!(path = %req.uri().path(), "missing bearer token");
		return Err(ServerError::Unauthorized);
	};

	let (user, token_id) = state
		.user_repo
		.get_user_by_token_hash(&hash_token(&token), Utc::now())
		.await?
		.ok_or_else(|| {
			tracing::debug!(path = %req.uri().path(), "unknown or expired token");
			ServerError::Unauthorized
		})?;

	tracing::trace!(user_id = %user.id, "request authenticated");
	req
		.extensions_mut()
		.insert(CurrentUser::from_api_token(user, token_id));
	Ok(next.run(req).await)
}

/// Extractor for the authenticated caller.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = ServerError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.extensions
			.get::<CurrentUser>()
			.cloned()
			.map(RequireAuth)
			.ok_or(ServerError::Unauthorized)
	}
}
