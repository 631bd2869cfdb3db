// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team repository for database operations.
//!
//! This module provides database access for:
//! - Teams (one live team per owning user)
//! - Memberships with roles from the seeded role catalogue
//! - Book and project access grants
//! - Client-to-team links
//!
//! Removal is a soft delete through `deleted_at`; every lookup ignores
//! soft-deleted rows.

use async_trait::async_trait;
use chrono::Utc;
use quill_server_auth::{
	AccessMode, AccessScope, BookId, ProjectId, StoreError, Team, TeamAccess, TeamAccessId, TeamClient,
	TeamClientId, TeamId, TeamMember, TeamMemberId, TeamRoleName, TeamStore, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{format_timestamp, parse_timestamp};

/// Repository for team database operations.
#[derive(Clone)]
pub struct TeamRepository {
	pool: SqlitePool,
}

impl TeamRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Teams
	// =========================================================================

	/// Create a team owned by `owner_user_id` and make the owner its admin.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the user already owns a live team.
	#[tracing::instrument(skip(self, name), fields(owner_user_id = %owner_user_id))]
	pub async fn create_team(&self, owner_user_id: UserId, name: &str) -> Result<Team, DbError> {
		let now = Utc::now();
		let mut tx = self.pool.begin().await?;

		let team_id = sqlx::query(
			r#"
			INSERT INTO teams (name, owner_user_id, created_at)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(name)
		.bind(owner_user_id.into_inner())
		.bind(format_timestamp(now))
		.execute(&mut *tx)
		.await
		.map_err(|e| DbError::on_insert(e, "team for owner"))?
		.last_insert_rowid();

		sqlx::query(
			r#"
			INSERT INTO team_members (team_id, user_id, role_id, has_billing_access, created_at)
			VALUES (?, ?, (SELECT id FROM team_roles WHERE name = ?), 1, ?)
			"#,
		)
		.bind(team_id)
		.bind(owner_user_id.into_inner())
		.bind(TeamRoleName::Admin.as_str())
		.bind(format_timestamp(now))
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		tracing::debug!(team_id, "team created");
		Ok(Team {
			id: TeamId::new(team_id),
			name: name.to_string(),
			owner_user_id,
			created_at: now,
		})
	}

	/// Get a live team by id.
	#[tracing::instrument(skip(self), fields(team_id = %id))]
	pub async fn get_team(&self, id: TeamId) -> Result<Option<Team>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, owner_user_id, created_at
			FROM teams
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(id.into_inner())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_team(&r)).transpose()
	}

	/// Soft-delete a team.
	#[tracing::instrument(skip(self), fields(team_id = %id))]
	pub async fn soft_delete_team(&self, id: TeamId) -> Result<bool, DbError> {
		let result = sqlx::query("UPDATE teams SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
			.bind(format_timestamp(Utc::now()))
			.bind(id.into_inner())
			.execute(&self.pool)
			.await?;

		tracing::debug!(team_id = %id, "team soft-deleted");
		Ok(result.rows_affected() > 0)
	}

	// =========================================================================
	// Members
	// =========================================================================

	/// Add a member with `role`.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the user already has a live membership.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id, role = %role))]
	pub async fn add_member(
		&self,
		team_id: TeamId,
		user_id: UserId,
		role: TeamRoleName,
		has_billing_access: bool,
	) -> Result<TeamMember, DbError> {
		let now = Utc::now();
		let id = sqlx::query(
			r#"
			INSERT INTO team_members (team_id, user_id, role_id, has_billing_access, created_at)
			VALUES (?, ?, (SELECT id FROM team_roles WHERE name = ?), ?, ?)
			"#,
		)
		.bind(team_id.into_inner())
		.bind(user_id.into_inner())
		.bind(role.as_str())
		.bind(has_billing_access as i32)
		.bind(format_timestamp(now))
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::on_insert(e, "team membership"))?
		.last_insert_rowid();

		tracing::debug!(member_id = id, "team member added");
		Ok(TeamMember {
			id: TeamMemberId::new(id),
			team_id,
			user_id,
			role,
			has_billing_access,
			created_at: now,
		})
	}

	/// Get the live membership of a user in a team.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	pub async fn get_member(
		&self,
		team_id: TeamId,
		user_id: UserId,
	) -> Result<Option<TeamMember>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT m.id, m.team_id, m.user_id, r.name AS role, m.has_billing_access, m.created_at
			FROM team_members m
			INNER JOIN team_roles r ON r.id = m.role_id
			WHERE m.team_id = ? AND m.user_id = ? AND m.deleted_at IS NULL
			"#,
		)
		.bind(team_id.into_inner())
		.bind(user_id.into_inner())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_member(&r)).transpose()
	}

	/// Soft-delete a membership.
	///
	/// # Returns
	/// `true` if a live membership was removed.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	pub async fn remove_member(&self, team_id: TeamId, user_id: UserId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE team_members SET deleted_at = ?
			WHERE team_id = ? AND user_id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(format_timestamp(Utc::now()))
		.bind(team_id.into_inner())
		.bind(user_id.into_inner())
		.execute(&self.pool)
		.await?;

		tracing::debug!(removed = result.rows_affected(), "team member removed");
		Ok(result.rows_affected() > 0)
	}

	// =========================================================================
	// Access grants
	// =========================================================================

	/// Grant `mode` on a book or project.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id, scope = ?scope, mode = %mode))]
	pub async fn grant_access(
		&self,
		team_id: TeamId,
		user_id: UserId,
		scope: AccessScope,
		mode: AccessMode,
	) -> Result<TeamAccess, DbError> {
		let id = sqlx::query(
			r#"
			INSERT INTO team_accesses (team_id, user_id, book_id, project_id, mode, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(team_id.into_inner())
		.bind(user_id.into_inner())
		.bind(scope.book_id().map(|b| b.into_inner()))
		.bind(scope.project_id().map(|p| p.into_inner()))
		.bind(mode.as_str())
		.bind(format_timestamp(Utc::now()))
		.execute(&self.pool)
		.await?
		.last_insert_rowid();

		tracing::debug!(access_id = id, "access granted");
		Ok(TeamAccess {
			id: TeamAccessId::new(id),
			team_id,
			user_id,
			scope,
			mode,
		})
	}

	/// Get the newest live grant on a live book, ignoring project-scoped grants.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id, book_id = %book_id))]
	pub async fn get_book_access(
		&self,
		team_id: TeamId,
		user_id: UserId,
		book_id: BookId,
	) -> Result<Option<TeamAccess>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT a.id, a.team_id, a.user_id, a.book_id, a.project_id, a.mode
			FROM team_accesses a
			INNER JOIN books b ON b.id = a.book_id AND b.deleted_at IS NULL
			WHERE a.team_id = ? AND a.user_id = ? AND a.book_id = ?
				AND a.project_id IS NULL AND a.deleted_at IS NULL
			ORDER BY a.id DESC
			LIMIT 1
			"#,
		)
		.bind(team_id.into_inner())
		.bind(user_id.into_inner())
		.bind(book_id.into_inner())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_access(&r)).transpose()
	}

	/// Soft-delete a grant.
	#[tracing::instrument(skip(self), fields(access_id = %id))]
	pub async fn revoke_access(&self, id: TeamAccessId) -> Result<bool, DbError> {
		let result =
			sqlx::query("UPDATE team_accesses SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
				.bind(format_timestamp(Utc::now()))
				.bind(id.into_inner())
				.execute(&self.pool)
				.await?;

		Ok(result.rows_affected() > 0)
	}

	// =========================================================================
	// Clients
	// =========================================================================

	/// Link a client user to a team.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the client is already linked.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	pub async fn add_client(&self, team_id: TeamId, user_id: UserId) -> Result<TeamClient, DbError> {
		let now = Utc::now();
		let id = sqlx::query(
			r#"
			INSERT INTO team_clients (team_id, user_id, created_at)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(team_id.into_inner())
		.bind(user_id.into_inner())
		.bind(format_timestamp(now))
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::on_insert(e, "team client"))?
		.last_insert_rowid();

		tracing::debug!(client_link_id = id, "team client added");
		Ok(TeamClient {
			id: TeamClientId::new(id),
			team_id,
			user_id,
			created_at: now,
		})
	}

	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	pub async fn remove_client(&self, team_id: TeamId, user_id: UserId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE team_clients SET deleted_at = ?
			WHERE team_id = ? AND user_id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(format_timestamp(Utc::now()))
		.bind(team_id.into_inner())
		.bind(user_id.into_inner())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	// =========================================================================
	// Row mapping
	// =========================================================================

	fn row_to_team(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Team, DbError> {
		let created_at: String = row.get("created_at");
		Ok(Team {
			id: TeamId::new(row.get("id")),
			name: row.get("name"),
			owner_user_id: UserId::new(row.get("owner_user_id")),
			created_at: parse_timestamp(&created_at, "created_at")?,
		})
	}

	fn row_to_member(&self, row: &sqlx::sqlite::SqliteRow) -> Result<TeamMember, DbError> {
		let role_str: String = row.get("role");
		let has_billing_access: i32 = row.get("has_billing_access");
		let created_at: String = row.get("created_at");

		let role = role_str
			.parse::<TeamRoleName>()
			.map_err(|_| DbError::Internal(format!("Invalid team role: {role_str}")))?;

		Ok(TeamMember {
			id: TeamMemberId::new(row.get("id")),
			team_id: TeamId::new(row.get("team_id")),
			user_id: UserId::new(row.get("user_id")),
			role,
			has_billing_access: has_billing_access != 0,
			created_at: parse_timestamp(&created_at, "created_at")?,
		})
	}

	fn row_to_access(&self, row: &sqlx::sqlite::SqliteRow) -> Result<TeamAccess, DbError> {
		let book_id: Option<i64> = row.get("book_id");
		let project_id: Option<i64> = row.get("project_id");
		let mode_str: String = row.get("mode");
		let id: i64 = row.get("id");

		let scope = match (book_id, project_id) {
			(Some(book_id), _) => AccessScope::Book(BookId::new(book_id)),
			(None, Some(project_id)) => AccessScope::Project(ProjectId::new(project_id)),
			(None, None) => {
				return Err(DbError::Internal(format!("Access grant {id} has no scope")));
			}
		};
		let mode = mode_str
			.parse::<AccessMode>()
			.map_err(|_| DbError::Internal(format!("Invalid access mode: {mode_str}")))?;

		Ok(TeamAccess {
			id: TeamAccessId::new(id),
			team_id: TeamId::new(row.get("team_id")),
			user_id: UserId::new(row.get("user_id")),
			scope,
			mode,
		})
	}
}

#[async_trait]
impl TeamStore for TeamRepository {
	async fn get_team(&self, team_id: TeamId) -> Result<Option<Team>, StoreError> {
		Ok(self.get_team(team_id).await?)
	}

	async fn get_member(
		&self,
		team_id: TeamId,
		user_id: UserId,
	) -> Result<Option<TeamMember>, StoreError> {
		Ok(self.get_member(team_id, user_id).await?)
	}

	async fn get_book_access(
		&self,
		team_id: TeamId,
		user_id: UserId,
		book_id: BookId,
	) -> Result<Option<TeamAccess>, StoreError> {
		Ok(self.get_book_access(team_id, user_id, book_id).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::content::ContentRepository;
	use crate::testing::{create_migrated_test_pool, insert_user};
	use crate::types::NewBook;

	async fn setup() -> (TeamRepository, SqlitePool, UserId) {
		let pool = create_migrated_test_pool().await;
		let owner = insert_user(&pool, "owner@example.com", false).await;
		(TeamRepository::new(pool.clone()), pool, owner)
	}

	#[tokio::test]
	async fn create_team_makes_owner_admin_with_billing() {
		let (repo, _pool, owner) = setup().await;
		let team = repo.create_team(owner, "Acme").await.unwrap();

		let fetched = repo.get_team(team.id).await.unwrap().unwrap();
		assert_eq!(fetched.name, "Acme");
		assert_eq!(fetched.owner_user_id, owner);

		let member = repo.get_member(team.id, owner).await.unwrap().unwrap();
		assert_eq!(member.role, TeamRoleName::Admin);
		assert!(member.has_billing_access);
	}

	#[tokio::test]
	async fn second_team_for_owner_conflicts() {
		let (repo, _pool, owner) = setup().await;
		repo.create_team(owner, "First").await.unwrap();
		let err = repo.create_team(owner, "Second").await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)), "{err}");
	}

	#[tokio::test]
	async fn owner_may_create_again_after_soft_delete() {
		let (repo, _pool, owner) = setup().await;
		let first = repo.create_team(owner, "First").await.unwrap();
		assert!(repo.soft_delete_team(first.id).await.unwrap());
		assert!(repo.get_team(first.id).await.unwrap().is_none());
		assert!(repo.create_team(owner, "Second").await.is_ok());
	}

	#[tokio::test]
	async fn duplicate_membership_conflicts_until_removed() {
		let (repo, pool, owner) = setup().await;
		let team = repo.create_team(owner, "Acme").await.unwrap();
		let user = insert_user(&pool, "u@example.com", false).await;

		repo.add_member(team.id, user, TeamRoleName::User, false).await.unwrap();
		let err = repo.add_member(team.id, user, TeamRoleName::Admin, false).await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));

		assert!(repo.remove_member(team.id, user).await.unwrap());
		assert!(repo.get_member(team.id, user).await.unwrap().is_none());
		let member = repo.add_member(team.id, user, TeamRoleName::SuperUser, false).await.unwrap();
		assert_eq!(member.role, TeamRoleName::SuperUser);
	}

	#[tokio::test]
	async fn book_access_ignores_project_grants_and_revoked_rows() {
		let (repo, pool, owner) = setup().await;
		let team = repo.create_team(owner, "Acme").await.unwrap();
		let content = ContentRepository::new(pool.clone());
		let book = content.create_book(&NewBook::new("Draft", owner, Some(team.id))).await.unwrap();
		let project = content.create_project(team.id, "Launch").await.unwrap();

		repo.grant_access(team.id, owner, AccessScope::Project(project.id), AccessMode::Write).await.unwrap();
		assert!(repo.get_book_access(team.id, owner, book.id).await.unwrap().is_none());

		let grant = repo.grant_access(team.id, owner, AccessScope::Book(book.id), AccessMode::Read).await.unwrap();
		let found = repo.get_book_access(team.id, owner, book.id).await.unwrap().unwrap();
		assert_eq!(found.mode, AccessMode::Read);
		assert_eq!(found.scope, AccessScope::Book(book.id));

		assert!(repo.revoke_access(grant.id).await.unwrap());
		assert!(repo.get_book_access(team.id, owner, book.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn book_access_ignores_grants_on_deleted_books() {
		let (repo, pool, owner) = setup().await;
		let team = repo.create_team(owner, "Acme").await.unwrap();
		let content = ContentRepository::new(pool.clone());
		let book = content.create_book(&NewBook::new("Draft", owner, Some(team.id))).await.unwrap();
		repo.grant_access(team.id, owner, AccessScope::Book(book.id), AccessMode::Write).await.unwrap();
		assert!(repo.get_book_access(team.id, owner, book.id).await.unwrap().is_some());

		assert!(content.soft_delete_book(book.id).await.unwrap());
		assert!(repo.get_book_access(team.id, owner, book.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn scope_check_constraint_rejects_unscoped_grant() {
		let (repo, pool, owner) = setup().await;
		let team = repo.create_team(owner, "Acme").await.unwrap();
		let result = sqlx::query(
			"INSERT INTO team_accesses (team_id, user_id, mode, created_at) VALUES (?, ?, 'read', ?)",
		)
		.bind(team.id.into_inner())
		.bind(owner.into_inner())
		.bind(format_timestamp(Utc::now()))
		.execute(&pool)
		.await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn client_link_is_unique_while_live() {
		let (repo, pool, owner) = setup().await;
		let team = repo.create_team(owner, "Acme").await.unwrap();
		let client = insert_user(&pool, "client@example.com", true).await;

		repo.add_client(team.id, client).await.unwrap();
		assert!(matches!(repo.add_client(team.id, client).await, Err(DbError::Conflict(_))));
		assert!(repo.remove_client(team.id, client).await.unwrap());
		assert!(repo.add_client(team.id, client).await.is_ok());
	}

	#[tokio::test]
	async fn store_trait_delegates() {
		let (repo, _pool, owner) = setup().await;
		let team = repo.create_team(owner, "Acme").await.unwrap();
		let store: &dyn TeamStore = &repo;

		assert!(store.get_team(team.id).await.unwrap().is_some());
		assert!(store.get_team(TeamId::new(999)).await.unwrap().is_none());
		assert!(store.get_member(team.id, UserId::new(999)).await.unwrap().is_none());
	}
}
