// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication helpers for request processing.
//!
//! This module provides:
//! - [`CurrentUser`] - authenticated user context placed in request extensions
//! - [`extract_bearer_token`] - reads the `Authorization: Bearer` header
//!
//! Token values are never logged.

use http::header::AUTHORIZATION;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{User, UserId};

/// The currently authenticated user, extracted from request context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
	/// The authenticated user.
	pub user: User,
	/// Row id of the API token used, if any.
	pub token_id: Option<i64>,
}

impl CurrentUser {
	pub fn from_api_token(user: User, token_id: i64) -> Self {
		Self {
			user,
			token_id: Some(token_id),
		}
	}

	pub fn user_id(&self) -> UserId {
		self.user.id
	}

	pub fn is_client(&self) -> bool {
		self.user.is_client
	}
}

/// Extract bearer token from the Authorization header.
///
/// Expects the format: `Authorization: Bearer <token>`. Returns `None` if the
/// header is absent, not valid UTF-8, uses another scheme, or carries an empty
/// token.
#[instrument(level = "trace", skip_all)]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
	let auth_header = headers.get(AUTHORIZATION)?;
	let auth_str = auth_header.to_str().ok()?;
	auth_str
		.strip_prefix("Bearer ")
		.map(str::trim)
		.filter(|token| !token.is_empty())
		.map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::header::HeaderValue;

	mod current_user {
		use super::*;
		use chrono::Utc;

		fn make_test_user(is_client: bool) -> User {
			User {
				id: UserId::new(4),
				email: "test@example.com".to_string(),
				display_name: "Test User".to_string(),
				is_client,
				created_at: Utc::now(),
			}
		}

		#[test]
		fn from_api_token_records_token() {
			let current = CurrentUser::from_api_token(make_test_user(false), 9);
			assert_eq!(current.token_id, Some(9));
			assert_eq!(current.user_id(), UserId::new(4));
			assert!(!current.is_client());
		}

		#[test]
		fn client_flag_is_exposed() {
			let current = CurrentUser::from_api_token(make_test_user(true), 1);
			assert!(current.is_client());
		}
	}

	mod bearer_token {
		use super::*;

		#[test]
		fn extracts_token() {
			let mut headers = HeaderMap::new();
			headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer qt_abc123"));
			assert_eq!(extract_bearer_token(&headers), Some("qt_abc123".to_string()));
		}

		#[test]
		fn missing_header_returns_none() {
			assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
		}

		#[test]
		fn other_scheme_returns_none() {
			let mut headers = HeaderMap::new();
			headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
			assert_eq!(extract_bearer_token(&headers), None);
		}

		#[test]
		fn empty_token_returns_none() {
			let mut headers = HeaderMap::new();
			headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
			assert_eq!(extract_bearer_token(&headers), None);
		}
	}
}
