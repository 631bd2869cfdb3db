// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::Utc;
use quill_server_auth::UserId;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::pool::run_migrations;
use crate::types::format_timestamp;

/// A single-connection in-memory database with the schema applied.
pub async fn create_migrated_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true);
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool");
	run_migrations(&pool).await.expect("Failed to run migrations");
	pool
}

pub async fn insert_user(pool: &SqlitePool, email: &str, is_client: bool) -> UserId {
	let id = sqlx::query(
		"INSERT INTO users (email, display_name, is_client, created_at) VALUES (?, ?, ?, ?)",
	)
	.bind(email)
	.bind(email)
	.bind(is_client as i32)
	.bind(format_timestamp(Utc::now()))
	.execute(pool)
	.await
	.expect("Failed to insert user")
	.last_insert_rowid();
	UserId::new(id)
}
