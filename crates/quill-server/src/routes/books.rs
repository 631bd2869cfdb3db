// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Book handlers.
//!
//! Book-scoped routes only run once the gate has confirmed a grant on the
//! book, so handlers look the row up without re-checking access.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use quill_server_auth::{AccessMode, BookId};
use quill_server_db::{Book, NewBook};
use serde::{Deserialize, Serialize};

use crate::{
	api::AppState, auth_middleware::RequireAuth, error::ServerError, team_gate::CurrentTeam,
};

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
	pub title: String,
}

/// POST /api/books - Create a book for the caller, inside the team when one
/// is given.
///
/// The creator receives a write grant so the book counts toward the team's
/// book quota.
pub async fn create_book(
	State(state): State<AppState>,
	RequireAuth(current): RequireAuth,
	team: CurrentTeam,
	Json(payload): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let title = payload.title.trim();
	if title.is_empty() {
		return Err(ServerError::bad_request("invalid_title", "book title is required"));
	}

	let team_id = team.0.team_id();
	state
		.gate
		.quota()
		.check_books(current.user_id(), team_id)
		.await?;

	let book = match team_id {
		Some(team_id) => {
			state
				.content_repo
				.create_team_book(title, current.user_id(), team_id)
				.await?
		}
		None => {
			state
				.content_repo
				.create_book(&NewBook::new(title, current.user_id(), None))
				.await?
		}
	};

	tracing::info!(book_id = %book.id, user_id = %current.user_id(), team_id = ?team_id, "book created");
	Ok((StatusCode::CREATED, Json(book)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
	pub book: Book,
	pub access: Option<AccessMode>,
}

/// GET /api/books/{book_id} - Read a book. A read grant suffices.
pub async fn get_book(
	State(state): State<AppState>,
	Path(book_id): Path<BookId>,
	team: CurrentTeam,
) -> Result<Json<BookResponse>, ServerError> {
	let book = state
		.content_repo
		.get_book(book_id)
		.await?
		.ok_or_else(|| ServerError::NotFound(format!("book {book_id}")))?;

	Ok(Json(BookResponse {
		book,
		access: team.0.get().and_then(|r| r.book_access),
	}))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
	pub title: String,
}

/// POST /api/books/{book_id}/tasks - Add a task, subject to the task limit.
pub async fn create_task(
	State(state): State<AppState>,
	Path(book_id): Path<BookId>,
	team: CurrentTeam,
	Json(payload): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let team_id = team.team_id()?;
	let title = payload.title.trim();
	if title.is_empty() {
		return Err(ServerError::bad_request("invalid_title", "task title is required"));
	}

	state.gate.quota().check_tasks(team_id).await?;

	let task = state.content_repo.create_task(book_id, title, false).await?;
	Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Debug, Deserialize)]
pub struct CreateAttachmentRequest {
	pub file_name: String,
	/// Size in bytes of the uploaded file.
	pub size: u64,
}

/// POST /api/books/{book_id}/attachments - Record an attachment, subject to the
/// per-file and total storage limits.
pub async fn create_attachment(
	State(state): State<AppState>,
	Path(book_id): Path<BookId>,
	team: CurrentTeam,
	Json(payload): Json<CreateAttachmentRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let team_id = team.team_id()?;

	state.gate.quota().check_size(team_id, payload.size).await?;

	let attachment = state
		.content_repo
		.create_attachment(team_id, Some(book_id), &payload.file_name, payload.size)
		.await?;
	Ok((StatusCode::CREATED, Json(attachment)))
}
