// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plan quota checks.
//!
//! Each check resolves the active plan, counts current usage and compares the
//! two. Checks run before the guarded write and do not lock anything, so two
//! concurrent requests can both pass and together overshoot a limit by a small
//! margin. Checks never mutate state; calling one twice without an
//! intervening write gives the same answer.
//!
//! When the relevant limit is unlimited the usage store is not consulted.

use std::sync::Arc;

use crate::error::{GateError, Resource, Result};
use crate::plan::Limit;
use crate::store::UsageStore;
use crate::subscription::{SubscriptionOwner, SubscriptionResolver};
use crate::types::{TeamId, UserId};

/// Reject when `current` already fills `limit`.
pub fn check_count(resource: Resource, current: u64, limit: Limit) -> Result<()> {
	if limit.has_room_for_another(current) {
		Ok(())
	} else {
		Err(GateError::QuotaExceeded(resource))
	}
}

/// Reject a single upload larger than the per-file ceiling.
pub fn check_file_size(new_size: u64, single_file_size: Limit) -> Result<()> {
	match single_file_size {
		Limit::Max(max) if new_size > max => Err(GateError::QuotaExceeded(Resource::FileSize)),
		_ => Ok(()),
	}
}

/// Reject when the projected total meets or exceeds the storage ceiling.
pub fn check_storage(existing: u64, new_size: u64, max_size: Limit) -> Result<()> {
	match max_size {
		Limit::Max(max) if existing.saturating_add(new_size) >= max => {
			Err(GateError::QuotaExceeded(Resource::Storage))
		}
		_ => Ok(()),
	}
}

/// Enforces plan limits for each countable resource.
#[derive(Clone)]
pub struct QuotaChecker {
	usage: Arc<dyn UsageStore>,
	subscriptions: SubscriptionResolver,
}

impl QuotaChecker {
	pub fn new(usage: Arc<dyn UsageStore>, subscriptions: SubscriptionResolver) -> Self {
		Self {
			usage,
			subscriptions,
		}
	}

	/// Books the user may still create.
	///
	/// Without a team, counts the user's personal books against their legacy
	/// personal plan. With a team, counts the books the team holds write grants
	/// on against the team plan.
	#[tracing::instrument(skip_all, fields(%user_id, team_id = ?team_id))]
	pub async fn check_books(&self, user_id: UserId, team_id: Option<TeamId>) -> Result<()> {
		let active = self.subscriptions.plan_for_actor(user_id, team_id).await?;
		let limit = active.plan.limits.max_books;
		if limit.is_unlimited() {
			return Ok(());
		}
		let current = match team_id {
			Some(team_id) => self.usage.count_team_books(team_id).await?,
			None => self.usage.count_personal_books(user_id).await?,
		};
		self.finish(Resource::Books, current, limit)
	}

	#[tracing::instrument(skip_all, fields(%team_id))]
	pub async fn check_members(&self, team_id: TeamId) -> Result<()> {
		let limit = self.team_limits(team_id).await?.max_members;
		if limit.is_unlimited() {
			return Ok(());
		}
		let current = self.usage.count_members(team_id).await?;
		self.finish(Resource::Members, current, limit)
	}

	#[tracing::instrument(skip_all, fields(%team_id))]
	pub async fn check_clients(&self, team_id: TeamId) -> Result<()> {
		let limit = self.team_limits(team_id).await?.max_clients;
		if limit.is_unlimited() {
			return Ok(());
		}
		let current = self.usage.count_clients(team_id).await?;
		self.finish(Resource::Clients, current, limit)
	}

	#[tracing::instrument(skip_all, fields(%team_id))]
	pub async fn check_projects(&self, team_id: TeamId) -> Result<()> {
		let limit = self.team_limits(team_id).await?.max_projects;
		if limit.is_unlimited() {
			return Ok(());
		}
		let current = self.usage.count_projects(team_id).await?;
		self.finish(Resource::Projects, current, limit)
	}

	#[tracing::instrument(skip_all, fields(%team_id))]
	pub async fn check_tasks(&self, team_id: TeamId) -> Result<()> {
		let limit = self.team_limits(team_id).await?.max_tasks;
		if limit.is_unlimited() {
			return Ok(());
		}
		let current = self.usage.count_tasks(team_id).await?;
		self.finish(Resource::Tasks, current, limit)
	}

	/// An upload of `new_size` bytes.
	///
	/// The per-file ceiling is checked first, before the team's existing
	/// attachment bytes are summed.
	#[tracing::instrument(skip_all, fields(%team_id, new_size))]
	pub async fn check_size(&self, team_id: TeamId, new_size: u64) -> Result<()> {
		let limits = self.team_limits(team_id).await?;
		check_file_size(new_size, limits.single_file_size).inspect_err(|_| {
			tracing::info!(%team_id, new_size, limit = %limits.single_file_size, "file exceeds single file size");
		})?;
		if limits.max_size.is_unlimited() {
			return Ok(());
		}
		let existing = self.usage.sum_attachment_sizes(team_id).await?;
		check_storage(existing, new_size, limits.max_size).inspect_err(|_| {
			tracing::info!(%team_id, existing, new_size, limit = %limits.max_size, "storage quota exceeded");
		})
	}

	async fn team_limits(&self, team_id: TeamId) -> Result<crate::plan::PlanLimits> {
		let active = self
			.subscriptions
			.get_active_plan(SubscriptionOwner::Team(team_id))
			.await?;
		Ok(active.plan.limits)
	}

	fn finish(&self, resource: Resource, current: u64, limit: Limit) -> Result<()> {
		check_count(resource, current, limit).inspect_err(|_| {
			tracing::info!(%resource, current, %limit, "quota exceeded");
		})
	}
}
