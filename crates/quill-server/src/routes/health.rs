// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Liveness handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::{api::AppState, version::VERSION};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub version: &'static str,
	pub database: &'static str,
}

/// GET /health - Reports whether the database answers.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let database_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
	if !database_ok {
		tracing::warn!("health check: database unreachable");
	}

	let (status, label) = if database_ok {
		(StatusCode::OK, "healthy")
	} else {
		(StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
	};

	(
		status,
		Json(HealthResponse {
			status: label,
			version: VERSION,
			database: if database_ok { "ok" } else { "unreachable" },
		}),
	)
}
