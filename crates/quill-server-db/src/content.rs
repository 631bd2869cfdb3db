// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Books, projects, tasks and attachment metadata.

use chrono::Utc;
use quill_server_auth::{AccessMode, AttachmentId, BookId, ProjectId, TaskId, TeamId, UserId};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{format_timestamp, parse_timestamp, Attachment, Book, NewBook, Project, Task};

#[derive(Clone)]
pub struct ContentRepository {
	pool: SqlitePool,
}

impl ContentRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, new), fields(user_id = %new.user_id))]
	pub async fn create_book(&self, new: &NewBook) -> Result<Book, DbError> {
		let now = Utc::now();
		let id = sqlx::query(
			r#"
			INSERT INTO books (title, user_id, team_id, is_section, is_sample, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&new.title)
		.bind(new.user_id.into_inner())
		.bind(new.team_id.map(|t| t.into_inner()))
		.bind(new.is_section as i32)
		.bind(new.is_sample as i32)
		.bind(format_timestamp(now))
		.execute(&self.pool)
		.await?
		.last_insert_rowid();

		tracing::debug!(book_id = id, "book created");
		Ok(Book {
			id: BookId::new(id),
			title: new.title.clone(),
			user_id: new.user_id,
			team_id: new.team_id,
			is_section: new.is_section,
			is_sample: new.is_sample,
			created_at: now,
		})
	}

	/// Create a team book and give its owner a write grant on it, in one
	/// transaction. The grant is what counts the book toward the team's book
	/// quota.
	#[tracing::instrument(skip(self, title), fields(team_id = %team_id, user_id = %user_id))]
	pub async fn create_team_book(
		&self,
		title: &str,
		user_id: UserId,
		team_id: TeamId,
	) -> Result<Book, DbError> {
		let now = Utc::now();
		let mut tx = self.pool.begin().await?;

		let book_id = sqlx::query(
			r#"
			INSERT INTO books (title, user_id, team_id, is_section, is_sample, created_at)
			VALUES (?, ?, ?, 0, 0, ?)
			"#,
		)
		.bind(title)
		.bind(user_id.into_inner())
		.bind(team_id.into_inner())
		.bind(format_timestamp(now))
		.execute(&mut *tx)
		.await?
		.last_insert_rowid();

		sqlx::query(
			r#"
			INSERT INTO team_accesses (team_id, user_id, book_id, project_id, mode, created_at)
			VALUES (?, ?, ?, NULL, ?, ?)
			"#,
		)
		.bind(team_id.into_inner())
		.bind(user_id.into_inner())
		.bind(book_id)
		.bind(AccessMode::Write.as_str())
		.bind(format_timestamp(now))
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		tracing::debug!(book_id, "team book created");
		Ok(Book {
			id: BookId::new(book_id),
			title: title.to_string(),
			user_id,
			team_id: Some(team_id),
			is_section: false,
			is_sample: false,
			created_at: now,
		})
	}

	/// Get a live book.
	#[tracing::instrument(skip(self), fields(book_id = %id))]
	pub async fn get_book(&self, id: BookId) -> Result<Option<Book>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, title, user_id, team_id, is_section, is_sample, created_at
			FROM books
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(id.into_inner())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_book(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(book_id = %id))]
	pub async fn soft_delete_book(&self, id: BookId) -> Result<bool, DbError> {
		let result = sqlx::query("UPDATE books SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
			.bind(format_timestamp(Utc::now()))
			.bind(id.into_inner())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self, name), fields(team_id = %team_id))]
	pub async fn create_project(&self, team_id: TeamId, name: &str) -> Result<Project, DbError> {
		let now = Utc::now();
		let id = sqlx::query("INSERT INTO projects (team_id, name, created_at) VALUES (?, ?, ?)")
			.bind(team_id.into_inner())
			.bind(name)
			.bind(format_timestamp(now))
			.execute(&self.pool)
			.await?
			.last_insert_rowid();

		Ok(Project {
			id: ProjectId::new(id),
			team_id,
			name: name.to_string(),
			created_at: now,
		})
	}

	#[tracing::instrument(skip(self, title), fields(book_id = %book_id))]
	pub async fn create_task(
		&self,
		book_id: BookId,
		title: &str,
		is_sample: bool,
	) -> Result<Task, DbError> {
		let now = Utc::now();
		let id = sqlx::query("INSERT INTO tasks (book_id, title, is_sample, created_at) VALUES (?, ?, ?, ?)")
			.bind(book_id.into_inner())
			.bind(title)
			.bind(is_sample as i32)
			.bind(format_timestamp(now))
			.execute(&self.pool)
			.await?
			.last_insert_rowid();

		Ok(Task {
			id: TaskId::new(id),
			book_id,
			title: title.to_string(),
			is_sample,
			created_at: now,
		})
	}

	/// Record attachment metadata. The caller has already stored the bytes.
	#[tracing::instrument(skip(self, file_name), fields(team_id = %team_id, size))]
	pub async fn create_attachment(
		&self,
		team_id: TeamId,
		book_id: Option<BookId>,
		file_name: &str,
		size: u64,
	) -> Result<Attachment, DbError> {
		let stored_size = i64::try_from(size)
			.map_err(|_| DbError::Internal(format!("Attachment size out of range: {size}")))?;
		let now = Utc::now();
		let id = sqlx::query(
			r#"
			INSERT INTO attachments (team_id, book_id, file_name, size, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(team_id.into_inner())
		.bind(book_id.map(|b| b.into_inner()))
		.bind(file_name)
		.bind(stored_size)
		.bind(format_timestamp(now))
		.execute(&self.pool)
		.await?
		.last_insert_rowid();

		Ok(Attachment {
			id: AttachmentId::new(id),
			team_id,
			book_id,
			file_name: file_name.to_string(),
			size,
			created_at: now,
		})
	}

	#[tracing::instrument(skip(self), fields(attachment_id = %id))]
	pub async fn soft_delete_attachment(&self, id: AttachmentId) -> Result<bool, DbError> {
		let result =
			sqlx::query("UPDATE attachments SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
				.bind(format_timestamp(Utc::now()))
				.bind(id.into_inner())
				.execute(&self.pool)
				.await?;
		Ok(result.rows_affected() > 0)
	}
}

fn row_to_book(row: &sqlx::sqlite::SqliteRow) -> Result<Book, DbError> {
	let team_id: Option<i64> = row.get("team_id");
	let is_section: i32 = row.get("is_section");
	let is_sample: i32 = row.get("is_sample");
	let created_at: String = row.get("created_at");

	Ok(Book {
		id: BookId::new(row.get("id")),
		title: row.get("title"),
		user_id: UserId::new(row.get("user_id")),
		team_id: team_id.map(TeamId::new),
		is_section: is_section != 0,
		is_sample: is_sample != 0,
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::team::TeamRepository;
	use crate::testing::{create_migrated_test_pool, insert_user};

	#[tokio::test]
	async fn book_round_trips_and_soft_deletes() {
		let pool = create_migrated_test_pool().await;
		let owner = insert_user(&pool, "owner@example.com", false).await;
		let repo = ContentRepository::new(pool);

		let book = repo.create_book(&NewBook::new("Field Notes", owner, None)).await.unwrap();
		let fetched = repo.get_book(book.id).await.unwrap().unwrap();
		assert_eq!(fetched.title, "Field Notes");
		assert_eq!(fetched.team_id, None);
		assert!(!fetched.is_section);

		assert!(repo.soft_delete_book(book.id).await.unwrap());
		assert!(!repo.soft_delete_book(book.id).await.unwrap());
		assert!(repo.get_book(book.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn team_book_comes_with_owner_write_grant() {
		let pool = create_migrated_test_pool().await;
		let owner = insert_user(&pool, "owner@example.com", false).await;
		let teams = TeamRepository::new(pool.clone());
		let team = teams.create_team(owner, "Acme").await.unwrap();
		let repo = ContentRepository::new(pool);

		let book = repo.create_team_book("Atlas", owner, team.id).await.unwrap();
		assert_eq!(book.team_id, Some(team.id));

		let grant = teams.get_book_access(team.id, owner, book.id).await.unwrap().unwrap();
		assert_eq!(grant.mode, AccessMode::Write);
	}

	#[tokio::test]
	async fn failed_grant_rolls_back_team_book() {
		let pool = create_migrated_test_pool().await;
		let owner = insert_user(&pool, "owner@example.com", false).await;
		let team = TeamRepository::new(pool.clone()).create_team(owner, "Acme").await.unwrap();
		sqlx::query("DROP TABLE team_accesses").execute(&pool).await.unwrap();
		let repo = ContentRepository::new(pool.clone());

		let err = repo.create_team_book("Orphan", owner, team.id).await.unwrap_err();
		assert!(matches!(err, DbError::Sqlx(_)), "{err}");

		let (books,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(books, 0);
	}

	#[tokio::test]
	async fn task_on_missing_book_violates_foreign_key() {
		let pool = create_migrated_test_pool().await;
		let repo = ContentRepository::new(pool);

		let err = repo.create_task(BookId::new(999), "Orphan", false).await.unwrap_err();
		assert!(matches!(err, DbError::Sqlx(_)));
	}

	#[tokio::test]
	async fn attachment_keeps_size_and_book() {
		let pool = create_migrated_test_pool().await;
		let owner = insert_user(&pool, "owner@example.com", false).await;
		let team = TeamRepository::new(pool.clone()).create_team(owner, "Acme").await.unwrap();
		let repo = ContentRepository::new(pool);
		let book = repo.create_book(&NewBook::new("Draft", owner, Some(team.id))).await.unwrap();

		let attachment = repo.create_attachment(team.id, Some(book.id), "cover.png", 2048).await.unwrap();
		assert_eq!(attachment.size, 2048);
		assert_eq!(attachment.book_id, Some(book.id));
		assert!(repo.soft_delete_attachment(attachment.id).await.unwrap());
	}
}
