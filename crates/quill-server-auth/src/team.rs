// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team management types.
//!
//! This module provides:
//! - [`Team`] - a tenant workspace owning books, projects and tasks
//! - [`TeamMember`] - links users to teams with roles
//! - [`TeamAccess`] - fine-grained read/write grant on a book or project
//! - [`TeamClient`] - links a client user to a team

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
	AccessMode, BookId, ProjectId, TeamAccessId, TeamClientId, TeamId, TeamMemberId, TeamRoleName,
	UserId,
};

/// A team (tenant workspace).
///
/// Each owning user has exactly one team; the store enforces this at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
	pub id: TeamId,
	pub name: String,
	pub owner_user_id: UserId,
	pub created_at: DateTime<Utc>,
}

/// A user's membership in a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
	pub id: TeamMemberId,
	pub team_id: TeamId,
	pub user_id: UserId,
	pub role: TeamRoleName,
	pub has_billing_access: bool,
	pub created_at: DateTime<Utc>,
}

impl TeamMember {
	/// Returns true if the member's role is one of `roles`.
	pub fn has_any_role(&self, roles: &[TeamRoleName]) -> bool {
		roles.contains(&self.role)
	}

	pub fn is_admin(&self) -> bool {
		self.role == TeamRoleName::Admin
	}
}

/// What a [`TeamAccess`] grant is scoped to.
///
/// A grant always targets exactly one book or one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AccessScope {
	Book(BookId),
	Project(ProjectId),
}

impl AccessScope {
	pub fn book_id(&self) -> Option<BookId> {
		match self {
			AccessScope::Book(id) => Some(*id),
			AccessScope::Project(_) => None,
		}
	}

	pub fn project_id(&self) -> Option<ProjectId> {
		match self {
			AccessScope::Book(_) => None,
			AccessScope::Project(id) => Some(*id),
		}
	}
}

/// A read/write grant for a (user, team) pair on a single book or project.
///
/// Absence of a grant means no access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAccess {
	pub id: TeamAccessId,
	pub team_id: TeamId,
	pub user_id: UserId,
	pub scope: AccessScope,
	pub mode: AccessMode,
}

/// A client user linked to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamClient {
	pub id: TeamClientId,
	pub team_id: TeamId,
	pub user_id: UserId,
	pub created_at: DateTime<Utc>,
}
