// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subscriptions and the active-plan resolver.
//!
//! A subscription binds a team (or, for accounts that predate teams, a single
//! user) to a catalogue plan. Plan changes never update a row in place: a new
//! row is inserted and earlier ones are deactivated. Deactivation is not
//! guaranteed to land atomically with the insert, so the resolver always picks
//! the newest active row by id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};
use crate::plan::{Plan, PlanCatalogue};
use crate::store::SubscriptionStore;
use crate::types::{PlanId, SubscriptionId, TeamId, UserId};

/// Who a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SubscriptionOwner {
	Team(TeamId),
	/// Legacy personal subscription.
	User(UserId),
}

impl std::fmt::Display for SubscriptionOwner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SubscriptionOwner::Team(id) => write!(f, "team:{id}"),
			SubscriptionOwner::User(id) => write!(f, "user:{id}"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
	pub id: SubscriptionId,
	pub owner: SubscriptionOwner,
	pub plan_id: PlanId,
	pub is_active: bool,
	pub is_cancelled: bool,
	/// `None` never expires.
	pub expire_at: Option<DateTime<Utc>>,
	pub extendable: bool,
	pub created_at: DateTime<Utc>,
}

impl Subscription {
	/// Returns true once `expire_at` has been reached.
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.expire_at.is_some_and(|expire_at| expire_at <= now)
	}
}

/// Extra narrowing applied on top of "active rows of this owner".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
	not_expired_at: Option<DateTime<Utc>>,
}

impl SubscriptionFilter {
	/// Every active row.
	pub fn any() -> Self {
		Self::default()
	}

	/// Only rows that have no expiry or expire after `now`.
	pub fn non_expired_at(now: DateTime<Utc>) -> Self {
		Self {
			not_expired_at: Some(now),
		}
	}

	pub fn not_expired_at(&self) -> Option<DateTime<Utc>> {
		self.not_expired_at
	}

	/// In-memory evaluation, used by non-SQL stores.
	pub fn matches(&self, subscription: &Subscription) -> bool {
		match self.not_expired_at {
			Some(now) => !subscription.is_expired_at(now),
			None => true,
		}
	}
}

/// A resolved subscription together with its catalogue plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivePlan {
	pub subscription: Subscription,
	pub plan: Plan,
}

impl ActivePlan {
	pub fn is_free(&self) -> bool {
		self.plan.is_free()
	}
}

/// Finds the current subscription and plan for a team or legacy user.
#[derive(Clone)]
pub struct SubscriptionResolver {
	store: Arc<dyn SubscriptionStore>,
	catalogue: Arc<PlanCatalogue>,
}

impl SubscriptionResolver {
	pub fn new(store: Arc<dyn SubscriptionStore>, catalogue: Arc<PlanCatalogue>) -> Self {
		Self { store, catalogue }
	}

	pub fn catalogue(&self) -> &PlanCatalogue {
		&self.catalogue
	}

	/// The newest active subscription of `owner`.
	///
	/// # Errors
	/// [`GateError::NoActiveSubscription`] when there is none.
	pub async fn get_active_subscription(&self, owner: SubscriptionOwner) -> Result<Subscription> {
		self
			.get_active_subscription_matching(owner, &SubscriptionFilter::any())
			.await
	}

	/// The newest active subscription of `owner` that also matches `filter`.
	#[tracing::instrument(skip_all, fields(%owner))]
	pub async fn get_active_subscription_matching(
		&self,
		owner: SubscriptionOwner,
		filter: &SubscriptionFilter,
	) -> Result<Subscription> {
		match self.store.find_active_subscription(owner, filter).await? {
			Some(subscription) => {
				tracing::debug!(subscription_id = %subscription.id, plan_id = %subscription.plan_id, "active subscription resolved");
				Ok(subscription)
			}
			None => {
				tracing::debug!("no active subscription");
				Err(GateError::NoActiveSubscription)
			}
		}
	}

	/// The newest active subscription of `owner` and its plan.
	pub async fn get_active_plan(&self, owner: SubscriptionOwner) -> Result<ActivePlan> {
		let subscription = self.get_active_subscription(owner).await?;
		self.attach_plan(subscription)
	}

	pub async fn is_free_plan(&self, owner: SubscriptionOwner) -> Result<bool> {
		Ok(self.get_active_plan(owner).await?.is_free())
	}

	/// The plan that bounds an actor: the team's when acting in a team,
	/// otherwise the user's personal subscription.
	pub async fn plan_for_actor(&self, user_id: UserId, team_id: Option<TeamId>) -> Result<ActivePlan> {
		let owner = match team_id {
			Some(team_id) => SubscriptionOwner::Team(team_id),
			None => SubscriptionOwner::User(user_id),
		};
		self.get_active_plan(owner).await
	}

	fn attach_plan(&self, subscription: Subscription) -> Result<ActivePlan> {
		let plan = self.catalogue.get(subscription.plan_id).cloned().ok_or_else(|| {
			tracing::error!(subscription_id = %subscription.id, plan_id = %subscription.plan_id, "subscription references unknown plan");
			GateError::Store(format!(
				"subscription {} references unknown plan {}",
				subscription.id, subscription.plan_id
			))
		})?;
		Ok(ActivePlan { subscription, plan })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::plan::PlanCode;
	use crate::testing::{sample_catalogue, InMemoryStore};
	use chrono::Duration;

	fn resolver(store: &Arc<InMemoryStore>) -> SubscriptionResolver {
		SubscriptionResolver::new(store.clone(), Arc::new(sample_catalogue()))
	}

	fn plan_id(code: PlanCode) -> PlanId {
		sample_catalogue().by_code(code).unwrap().id
	}

	#[test]
	fn expiry_boundary() {
		let now = Utc::now();
		let mut sub = InMemoryStore::new().subscribe(SubscriptionOwner::Team(TeamId::new(1)), plan_id(PlanCode::Free));
		assert!(!sub.is_expired_at(now));

		sub.expire_at = Some(now - Duration::seconds(1));
		assert!(sub.is_expired_at(now));

		sub.expire_at = Some(now + Duration::seconds(1));
		assert!(!sub.is_expired_at(now));
	}

	#[test]
	fn non_expired_filter_excludes_past_rows() {
		let now = Utc::now();
		let mut sub = InMemoryStore::new().subscribe(SubscriptionOwner::Team(TeamId::new(1)), plan_id(PlanCode::Free));
		sub.expire_at = Some(now - Duration::seconds(5));
		assert!(SubscriptionFilter::any().matches(&sub));
		assert!(!SubscriptionFilter::non_expired_at(now).matches(&sub));
	}

	#[tokio::test]
	async fn no_rows_is_no_active_subscription() {
		let store = Arc::new(InMemoryStore::new());
		let err = resolver(&store)
			.get_active_plan(SubscriptionOwner::Team(TeamId::new(1)))
			.await
			.unwrap_err();
		assert_eq!(err, GateError::NoActiveSubscription);
	}

	#[tokio::test]
	async fn newest_active_row_wins() {
		let store = Arc::new(InMemoryStore::new());
		let owner = SubscriptionOwner::Team(TeamId::new(1));
		store.subscribe(owner, plan_id(PlanCode::Free));
		let newer = store.subscribe(owner, plan_id(PlanCode::TeamMonthly));

		let active = resolver(&store).get_active_plan(owner).await.unwrap();
		assert_eq!(active.subscription.id, newer.id);
		assert_eq!(active.plan.code, PlanCode::TeamMonthly);
	}

	#[tokio::test]
	async fn inactive_rows_are_ignored() {
		let store = Arc::new(InMemoryStore::new());
		let owner = SubscriptionOwner::Team(TeamId::new(1));
		let older = store.subscribe(owner, plan_id(PlanCode::Trial));
		let newer = store.subscribe(owner, plan_id(PlanCode::TeamYearly));
		store.deactivate_subscription(newer.id);

		let active = resolver(&store).get_active_subscription(owner).await.unwrap();
		assert_eq!(active.id, older.id);
	}

	#[tokio::test]
	async fn is_free_plan_compares_catalogue_code() {
		let store = Arc::new(InMemoryStore::new());
		let free_team = SubscriptionOwner::Team(TeamId::new(1));
		let paid_team = SubscriptionOwner::Team(TeamId::new(2));
		store.subscribe(free_team, plan_id(PlanCode::Free));
		store.subscribe(paid_team, plan_id(PlanCode::TeamYearly));

		let resolver = resolver(&store);
		assert!(resolver.is_free_plan(free_team).await.unwrap());
		assert!(!resolver.is_free_plan(paid_team).await.unwrap());
	}

	#[tokio::test]
	async fn plan_for_actor_uses_legacy_user_subscription_without_team() {
		let store = Arc::new(InMemoryStore::new());
		let user_id = UserId::new(7);
		store.subscribe(SubscriptionOwner::User(user_id), plan_id(PlanCode::Trial));
		store.subscribe(SubscriptionOwner::Team(TeamId::new(3)), plan_id(PlanCode::Free));

		let resolver = resolver(&store);
		let personal = resolver.plan_for_actor(user_id, None).await.unwrap();
		assert_eq!(personal.plan.code, PlanCode::Trial);

		let team = resolver.plan_for_actor(user_id, Some(TeamId::new(3))).await.unwrap();
		assert_eq!(team.plan.code, PlanCode::Free);
	}

	#[tokio::test]
	async fn unknown_plan_is_internal_error() {
		let store = Arc::new(InMemoryStore::new());
		let owner = SubscriptionOwner::Team(TeamId::new(1));
		store.subscribe(owner, PlanId::new(999));

		let err = resolver(&store).get_active_plan(owner).await.unwrap_err();
		assert!(matches!(err, GateError::Store(_)));
	}

	#[tokio::test]
	async fn filter_skips_expired_newest_row() {
		let store = Arc::new(InMemoryStore::new());
		let owner = SubscriptionOwner::Team(TeamId::new(1));
		let now = Utc::now();
		let older = store.subscribe(owner, plan_id(PlanCode::Free));
		let newer = store.subscribe(owner, plan_id(PlanCode::Trial));
		store.set_expiry(newer.id, Some(now - Duration::days(1)));

		let found = resolver(&store)
			.get_active_subscription_matching(owner, &SubscriptionFilter::non_expired_at(now))
			.await
			.unwrap();
		assert_eq!(found.id, older.id);
	}
}
