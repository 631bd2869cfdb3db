// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error type and its JSON rejection body.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use quill_server_auth::GateError;
use quill_server_db::DbError;
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub message: String,
	pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error(transparent)]
	Gate(#[from] GateError),

	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("authentication required")]
	Unauthorized,

	#[error("{message}")]
	BadRequest { code: &'static str, message: String },

	#[error("{0} not found")]
	NotFound(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl ServerError {
	pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
		ServerError::BadRequest {
			code,
			message: message.into(),
		}
	}

	pub fn status(&self) -> StatusCode {
		match self {
			ServerError::Gate(err) => {
				StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
			}
			ServerError::Db(DbError::NotFound(_)) | ServerError::NotFound(_) => StatusCode::NOT_FOUND,
			ServerError::Db(DbError::Conflict(_)) => StatusCode::CONFLICT,
			ServerError::Db(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
			ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
			ServerError::BadRequest { .. } => StatusCode::BAD_REQUEST,
		}
	}

	pub fn code(&self) -> &'static str {
		match self {
			ServerError::Gate(err) => err.code(),
			ServerError::Db(DbError::NotFound(_)) | ServerError::NotFound(_) => "not_found",
			ServerError::Db(DbError::Conflict(_)) => "conflict",
			ServerError::Db(_) | ServerError::Internal(_) => "internal_error",
			ServerError::Unauthorized => "unauthorized",
			ServerError::BadRequest { code, .. } => *code,
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let status = self.status();
		let message = if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
			"Internal server error".to_string()
		} else {
			self.to_string()
		};

		let body = ErrorResponse {
			message,
			code: self.code().to_string(),
		};
		(status, Json(body)).into_response()
	}
}
