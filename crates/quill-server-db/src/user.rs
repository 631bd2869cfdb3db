// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User and API token storage.
//!
//! Only SHA-256 hashes of API tokens are stored.

use chrono::{DateTime, Utc};
use quill_server_auth::{User, UserId};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{format_timestamp, parse_timestamp};

#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a user.
	///
	/// # Errors
	/// Returns [`DbError::Conflict`] if the email is taken.
	#[tracing::instrument(skip(self, email, display_name))]
	pub async fn create_user(
		&self,
		email: &str,
		display_name: &str,
		is_client: bool,
	) -> Result<User, DbError> {
		let now = Utc::now();
		let id = sqlx::query(
			"INSERT INTO users (email, display_name, is_client, created_at) VALUES (?, ?, ?, ?)",
		)
		.bind(email)
		.bind(display_name)
		.bind(is_client as i32)
		.bind(format_timestamp(now))
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::on_insert(e, "user"))?
		.last_insert_rowid();

		tracing::debug!(user_id = id, "user created");
		Ok(User {
			id: UserId::new(id),
			email: email.to_string(),
			display_name: display_name.to_string(),
			is_client,
			created_at: now,
		})
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user(&self, id: UserId) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, display_name, is_client, created_at
			FROM users
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(id.into_inner())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_user(&r)).transpose()
	}

	/// Store a hashed API token and return its row id.
	#[tracing::instrument(skip(self, token_hash), fields(user_id = %user_id))]
	pub async fn create_api_token(
		&self,
		user_id: UserId,
		token_hash: &str,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<i64, DbError> {
		let id = sqlx::query(
			"INSERT INTO api_tokens (user_id, token_hash, created_at, expires_at) VALUES (?, ?, ?, ?)",
		)
		.bind(user_id.into_inner())
		.bind(token_hash)
		.bind(format_timestamp(Utc::now()))
		.bind(expires_at.map(format_timestamp))
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::on_insert(e, "api token"))?
		.last_insert_rowid();

		Ok(id)
	}

	/// Look up the live user owning an unexpired token hash.
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_user_by_token_hash(
		&self,
		token_hash: &str,
		now: DateTime<Utc>,
	) -> Result<Option<(User, i64)>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT u.id, u.email, u.display_name, u.is_client, u.created_at, t.id AS token_id
			FROM api_tokens t
			JOIN users u ON u.id = t.user_id
			WHERE t.token_hash = ?
				AND (t.expires_at IS NULL OR t.expires_at > ?)
				AND u.deleted_at IS NULL
			"#,
		)
		.bind(token_hash)
		.bind(format_timestamp(now))
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(r) => {
				let token_id: i64 = r.get("token_id");
				Ok(Some((row_to_user(&r)?, token_id)))
			}
			None => Ok(None),
		}
	}
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
	let is_client: i32 = row.get("is_client");
	let created_at: String = row.get("created_at");

	Ok(User {
		id: UserId::new(row.get("id")),
		email: row.get("email"),
		display_name: row.get("display_name"),
		is_client: is_client != 0,
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_migrated_test_pool;
	use chrono::Duration;
	use quill_server_auth::hash_token;

	#[tokio::test]
	async fn duplicate_email_conflicts() {
		let repo = UserRepository::new(create_migrated_test_pool().await);
		repo.create_user("a@example.com", "A", false).await.unwrap();

		let err = repo.create_user("a@example.com", "Again", false).await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn token_lookup_returns_owner() {
		let repo = UserRepository::new(create_migrated_test_pool().await);
		let user = repo.create_user("c@example.com", "Client", true).await.unwrap();
		let hash = hash_token("qt_secret");
		let token_id = repo.create_api_token(user.id, &hash, None).await.unwrap();

		let (found, found_token) = repo.get_user_by_token_hash(&hash, Utc::now()).await.unwrap().unwrap();
		assert_eq!(found.id, user.id);
		assert!(found.is_client);
		assert_eq!(found_token, token_id);

		assert!(repo.get_user_by_token_hash(&hash_token("qt_other"), Utc::now()).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn expired_token_is_ignored() {
		let repo = UserRepository::new(create_migrated_test_pool().await);
		let user = repo.create_user("e@example.com", "E", false).await.unwrap();
		let now = Utc::now();
		let hash = hash_token("qt_stale");
		repo.create_api_token(user.id, &hash, Some(now - Duration::minutes(1))).await.unwrap();

		assert!(repo.get_user_by_token_hash(&hash, now).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn get_user_by_id() {
		let repo = UserRepository::new(create_migrated_test_pool().await);
		let user = repo.create_user("g@example.com", "G", false).await.unwrap();

		assert_eq!(repo.get_user(user.id).await.unwrap().unwrap().email, "g@example.com");
		assert!(repo.get_user(UserId::new(999)).await.unwrap().is_none());
	}
}
