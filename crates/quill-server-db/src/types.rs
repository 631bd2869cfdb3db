// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, SecondsFormat, Utc};
use quill_server_auth::{AttachmentId, BookId, ProjectId, TaskId, TeamId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// A book row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
	pub id: BookId,
	pub title: String,
	pub user_id: UserId,
	pub team_id: Option<TeamId>,
	pub is_section: bool,
	pub is_sample: bool,
	pub created_at: DateTime<Utc>,
}

/// Fields for inserting a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
	pub title: String,
	pub user_id: UserId,
	pub team_id: Option<TeamId>,
	pub is_section: bool,
	pub is_sample: bool,
}

impl NewBook {
	pub fn new(title: impl Into<String>, user_id: UserId, team_id: Option<TeamId>) -> Self {
		Self {
			title: title.into(),
			user_id,
			team_id,
			is_section: false,
			is_sample: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
	pub id: ProjectId,
	pub team_id: TeamId,
	pub name: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
	pub id: TaskId,
	pub book_id: BookId,
	pub title: String,
	pub is_sample: bool,
	pub created_at: DateTime<Utc>,
}

/// Attachment metadata. File bodies live outside the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
	pub id: AttachmentId,
	pub team_id: TeamId,
	pub book_id: Option<BookId>,
	pub file_name: String,
	pub size: u64,
	pub created_at: DateTime<Utc>,
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(raw)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_optional_timestamp(
	raw: Option<String>,
	field: &str,
) -> Result<Option<DateTime<Utc>>, DbError> {
	raw.map(|r| parse_timestamp(&r, field)).transpose()
}

/// SQLite returns counts and sums as signed integers.
pub(crate) fn to_count(raw: i64) -> u64 {
	u64::try_from(raw).unwrap_or(0)
}
