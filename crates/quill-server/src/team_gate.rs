// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route-level team gate.
//!
//! Each route group is wrapped with [`team_gate_layer`] and its own
//! [`GateOptions`]:
//!
//! ```ignore
//! Router::new()
//!     .route("/team/members", post(routes::team::add_member))
//!     .route_layer(from_fn_with_state(
//!         RouteGate::new(state.clone(), GateOptions::new().required().deny_clients()),
//!         team_gate_layer,
//!     ))
//! ```
//!
//! The layer reads the team header and the book id (path segment `book_id`,
//! else the `book_id` query parameter), evaluates the gate and stores the
//! resulting [`TeamContext`] for handlers. It must sit inside
//! [`crate::auth_middleware::require_auth_layer`].

use std::sync::Arc;

use axum::{
	extract::{FromRequestParts, Query, RawPathParams, Request, State},
	http::request::Parts,
	middleware::Next,
	response::Response,
};
use quill_server_auth::{BookId, CurrentUser, GateOptions, TeamContext, TeamId};
use serde::Deserialize;

use crate::{api::AppState, error::ServerError};

const BOOK_ID_PARAM: &str = "book_id";

/// Middleware state: the app plus the options for one route group.
#[derive(Clone)]
pub struct RouteGate {
	state: AppState,
	options: Arc<GateOptions>,
}

impl RouteGate {
	pub fn new(state: AppState, options: GateOptions) -> Self {
		Self {
			state,
			options: Arc::new(options),
		}
	}
}

#[derive(Debug, Deserialize)]
struct BookQuery {
	book_id: Option<String>,
}

/// Parse the team header. A missing or blank header is `None`.
pub fn parse_team_header(parts: &Parts, header: &str) -> Result<Option<TeamId>, ServerError> {
	let Some(value) = parts.headers.get(header) else {
		return Ok(None);
	};

	let raw = value
		.to_str()
		.map_err(|_| invalid_team_header(header))?
		.trim();
	if raw.is_empty() {
		return Ok(None);
	}

	raw.parse().map(Some).map_err(|_| invalid_team_header(header))
}

fn invalid_team_header(header: &str) -> ServerError {
	ServerError::bad_request("invalid_team_header", format!("{header} must be a team id"))
}

/// Book id from the `book_id` path segment, falling back to the query string.
pub async fn parse_book_id(parts: &mut Parts) -> Result<Option<BookId>, ServerError> {
	let from_path = RawPathParams::from_request_parts(parts, &())
		.await
		.ok()
		.and_then(|params| {
			params
				.iter()
				.find(|(key, _)| *key == BOOK_ID_PARAM)
				.map(|(_, value)| value.to_string())
		});

	let raw = match from_path {
		Some(raw) => Some(raw),
		None => Query::<BookQuery>::try_from_uri(&parts.uri)
			.ok()
			.and_then(|Query(q)| q.book_id),
	};

	match raw {
		Some(raw) => raw.parse().map(Some).map_err(|_| {
			ServerError::bad_request("invalid_book_id", format!("{raw:?} is not a book id"))
		}),
		None => Ok(None),
	}
}

/// Evaluate the gate for the route group and store the [`TeamContext`].
pub async fn team_gate_layer(
	State(gate): State<RouteGate>,
	req: Request,
	next: Next,
) -> Result<Response, ServerError> {
	let (mut parts, body) = req.into_parts();

	let current = parts
		.extensions
		.get::<CurrentUser>()
		.cloned()
		.ok_or(ServerError::Unauthorized)?;

	let team_id = parse_team_header(&parts, &gate.state.team_header)?;
	let book_id = parse_book_id(&mut parts).await?;

	let context = gate
		.state
		.gate
		.resolve(&current.user, team_id, book_id, &gate.options)
		.await?;

	parts.extensions.insert(context);
	Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Extractor for the gate outcome.
#[derive(Debug, Clone)]
pub struct CurrentTeam(pub TeamContext);

impl CurrentTeam {
	/// The resolved team id. Routes gated with `required` always have one.
	pub fn team_id(&self) -> Result<TeamId, ServerError> {
		self
			.0
			.team_id()
			.ok_or(ServerError::Gate(quill_server_auth::GateError::TeamNotFound))
	}
}

impl<S> FromRequestParts<S> for CurrentTeam
where
	S: Send + Sync,
{
	type Rejection = ServerError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.extensions
			.get::<TeamContext>()
			.cloned()
			.map(CurrentTeam)
			.ok_or_else(|| ServerError::Internal("team gate not applied to route".to_string()))
	}
}
