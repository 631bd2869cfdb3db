// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Usage counters feeding quota checks.
//!
//! Every counter ignores soft-deleted rows. Section and sample books never
//! count toward a book quota.

use async_trait::async_trait;
use quill_server_auth::{StoreError, TeamId, UsageStore, UserId};
use sqlx::sqlite::SqlitePool;

use crate::error::DbError;
use crate::types::to_count;

#[derive(Clone)]
pub struct UsageRepository {
	pool: SqlitePool,
}

impl UsageRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	async fn scalar(&self, sql: &str, id: i64) -> Result<u64, DbError> {
		let (value,): (i64,) = sqlx::query_as(sql).bind(id).fetch_one(&self.pool).await?;
		Ok(to_count(value))
	}

	/// Books a user owns outside any team.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn count_personal_books(&self, user_id: UserId) -> Result<u64, DbError> {
		self
			.scalar(
				r#"
				SELECT COUNT(*) FROM books
				WHERE user_id = ? AND team_id IS NULL
					AND is_section = 0 AND is_sample = 0 AND deleted_at IS NULL
				"#,
				user_id.into_inner(),
			)
			.await
	}

	/// Distinct books any member holds a live write grant on.
	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	pub async fn count_team_books(&self, team_id: TeamId) -> Result<u64, DbError> {
		self
			.scalar(
				r#"
				SELECT COUNT(DISTINCT a.book_id)
				FROM team_accesses a
				JOIN books b ON b.id = a.book_id
				WHERE a.team_id = ? AND a.mode = 'write' AND a.project_id IS NULL
					AND a.deleted_at IS NULL
					AND b.is_section = 0 AND b.is_sample = 0 AND b.deleted_at IS NULL
				"#,
				team_id.into_inner(),
			)
			.await
	}

	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	pub async fn count_members(&self, team_id: TeamId) -> Result<u64, DbError> {
		self
			.scalar(
				"SELECT COUNT(*) FROM team_members WHERE team_id = ? AND deleted_at IS NULL",
				team_id.into_inner(),
			)
			.await
	}

	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	pub async fn count_clients(&self, team_id: TeamId) -> Result<u64, DbError> {
		self
			.scalar(
				"SELECT COUNT(*) FROM team_clients WHERE team_id = ? AND deleted_at IS NULL",
				team_id.into_inner(),
			)
			.await
	}

	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	pub async fn count_projects(&self, team_id: TeamId) -> Result<u64, DbError> {
		self
			.scalar(
				"SELECT COUNT(*) FROM projects WHERE team_id = ? AND deleted_at IS NULL",
				team_id.into_inner(),
			)
			.await
	}

	/// Non-sample tasks on books the team holds a live grant on.
	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	pub async fn count_tasks(&self, team_id: TeamId) -> Result<u64, DbError> {
		self
			.scalar(
				r#"
				SELECT COUNT(*) FROM tasks t
				WHERE t.is_sample = 0 AND t.deleted_at IS NULL
					AND t.book_id IN (
						SELECT a.book_id FROM team_accesses a
						JOIN books b ON b.id = a.book_id
						WHERE a.team_id = ? AND a.deleted_at IS NULL AND b.deleted_at IS NULL
					)
				"#,
				team_id.into_inner(),
			)
			.await
	}

	/// Total bytes of live attachments.
	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	pub async fn sum_attachment_sizes(&self, team_id: TeamId) -> Result<u64, DbError> {
		self
			.scalar(
				"SELECT COALESCE(SUM(size), 0) FROM attachments WHERE team_id = ? AND deleted_at IS NULL",
				team_id.into_inner(),
			)
			.await
	}
}

#[async_trait]
impl UsageStore for UsageRepository {
	async fn count_personal_books(&self, user_id: UserId) -> Result<u64, StoreError> {
		Ok(self.count_personal_books(user_id).await?)
	}

	async fn count_team_books(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.count_team_books(team_id).await?)
	}

	async fn count_members(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.count_members(team_id).await?)
	}

	async fn count_clients(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.count_clients(team_id).await?)
	}

	async fn count_projects(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.count_projects(team_id).await?)
	}

	async fn count_tasks(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.count_tasks(team_id).await?)
	}

	async fn sum_attachment_sizes(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.sum_attachment_sizes(team_id).await?)
	}
}
