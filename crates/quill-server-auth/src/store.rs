// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only store seams the gate evaluates against.
//!
//! The gate never writes. Each trait is the narrow set of point lookups and
//! counts one component needs, implemented by `quill-server-db` for SQLite and
//! by [`crate::testing`] in memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::subscription::{Subscription, SubscriptionFilter, SubscriptionOwner};
use crate::team::{Team, TeamAccess, TeamMember};
use crate::types::{BookId, TeamId, UserId};

/// Lookups used by the access resolver.
#[async_trait]
pub trait TeamStore: Send + Sync {
	/// Load a live (not deleted) team.
	async fn get_team(&self, team_id: TeamId) -> Result<Option<Team>, StoreError>;

	/// Load the live membership of `user_id` in `team_id`.
	async fn get_member(
		&self,
		team_id: TeamId,
		user_id: UserId,
	) -> Result<Option<TeamMember>, StoreError>;

	/// Load the live grant for `user_id` on `book_id`, ignoring project grants.
	async fn get_book_access(
		&self,
		team_id: TeamId,
		user_id: UserId,
		book_id: BookId,
	) -> Result<Option<TeamAccess>, StoreError>;
}

/// Lookups used by the subscription resolver.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
	/// The newest active subscription of `owner` that matches `filter`.
	///
	/// "Newest" is the highest id.
	async fn find_active_subscription(
		&self,
		owner: SubscriptionOwner,
		filter: &SubscriptionFilter,
	) -> Result<Option<Subscription>, StoreError>;
}

/// Usage counters used by the quota checker.
///
/// Every count excludes soft-deleted rows.
#[async_trait]
pub trait UsageStore: Send + Sync {
	/// Non-section, non-sample books the user owns outside any team.
	async fn count_personal_books(&self, user_id: UserId) -> Result<u64, StoreError>;

	/// Distinct non-section, non-sample books reachable through a team's
	/// write-mode book grants.
	async fn count_team_books(&self, team_id: TeamId) -> Result<u64, StoreError>;

	async fn count_members(&self, team_id: TeamId) -> Result<u64, StoreError>;

	async fn count_clients(&self, team_id: TeamId) -> Result<u64, StoreError>;

	async fn count_projects(&self, team_id: TeamId) -> Result<u64, StoreError>;

	/// Non-sample tasks across every book the team holds a grant on.
	async fn count_tasks(&self, team_id: TeamId) -> Result<u64, StoreError>;

	/// Total bytes of the team's attachments.
	async fn sum_attachment_sizes(&self, team_id: TeamId) -> Result<u64, StoreError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}
