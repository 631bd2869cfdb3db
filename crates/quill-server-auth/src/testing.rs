// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory store and fixed clock for tests.
//!
//! Enabled for this crate's own tests and for downstream crates through the
//! `test-support` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;
use crate::plan::{Limit, Plan, PlanCatalogue, PlanCode, PlanLimits};
use crate::store::{Clock, SubscriptionStore, TeamStore, UsageStore};
use crate::subscription::{Subscription, SubscriptionFilter, SubscriptionOwner};
use crate::team::{AccessScope, Team, TeamAccess, TeamMember};
use crate::types::{
	AccessMode, BookId, PlanId, SubscriptionId, TeamAccessId, TeamId, TeamMemberId, TeamRoleName,
	UserId,
};
use crate::user::User;

const MB: i64 = 1024 * 1024;
const GB: i64 = 1024 * MB;

/// The seeded plan catalogue, mirroring the database seed.
pub fn sample_catalogue() -> PlanCatalogue {
	let plan = |id: i64, code: PlanCode, raw: [i64; 7]| Plan {
		id: PlanId::new(id),
		code,
		name: code.display_name().to_string(),
		limits: PlanLimits {
			max_books: Limit::from_raw(raw[0]),
			max_members: Limit::from_raw(raw[1]),
			max_clients: Limit::from_raw(raw[2]),
			max_projects: Limit::from_raw(raw[3]),
			max_tasks: Limit::from_raw(raw[4]),
			max_size: Limit::from_raw(raw[5]),
			single_file_size: Limit::from_raw(raw[6]),
		},
	};
	PlanCatalogue::new([
		plan(1, PlanCode::Free, [1, 1, 0, 1, 50, 100 * MB, 10 * MB]),
		plan(2, PlanCode::Trial, [10, 5, 5, 10, -1, GB, 50 * MB]),
		plan(3, PlanCode::TeamMonthly, [-1, 25, 50, -1, -1, 50 * GB, 200 * MB]),
		plan(4, PlanCode::TeamYearly, [-1, 25, 50, -1, -1, 50 * GB, 200 * MB]),
	])
}

pub fn user(id: i64) -> User {
	User {
		id: UserId::new(id),
		email: format!("user{id}@example.com"),
		display_name: format!("User {id}"),
		is_client: false,
		created_at: Utc::now(),
	}
}

pub fn client(id: i64) -> User {
	User {
		is_client: true,
		..user(id)
	}
}

/// Usage counters returned for a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
	pub books: u64,
	pub members: u64,
	pub clients: u64,
	pub projects: u64,
	pub tasks: u64,
	pub storage_bytes: u64,
}

#[derive(Default)]
struct State {
	teams: HashMap<TeamId, Team>,
	members: Vec<TeamMember>,
	accesses: Vec<TeamAccess>,
	subscriptions: Vec<Subscription>,
	usage: HashMap<TeamId, Usage>,
	personal_books: HashMap<UserId, u64>,
	next_id: i64,
}

impl State {
	fn next_id(&mut self) -> i64 {
		self.next_id += 1;
		self.next_id
	}
}

/// Implements every store trait over plain collections.
///
/// Counts how many usage reads were made so tests can assert that a check
/// short-circuited before counting.
#[derive(Default)]
pub struct InMemoryStore {
	state: Mutex<State>,
	usage_reads: AtomicUsize,
}

impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub fn add_team(&self, id: TeamId, owner_user_id: UserId) -> Team {
		let team = Team {
			id,
			name: format!("Team {id}"),
			owner_user_id,
			created_at: Utc::now(),
		};
		self.lock().teams.insert(id, team.clone());
		team
	}

	pub fn add_member(&self, team_id: TeamId, user_id: UserId, role: TeamRoleName) -> TeamMember {
		let mut state = self.lock();
		let member = TeamMember {
			id: TeamMemberId::new(state.next_id()),
			team_id,
			user_id,
			role,
			has_billing_access: role == TeamRoleName::Admin,
			created_at: Utc::now(),
		};
		state.members.push(member.clone());
		member
	}

	pub fn add_book_access(&self, team_id: TeamId, user_id: UserId, book_id: BookId, mode: AccessMode) {
		let mut state = self.lock();
		let access = TeamAccess {
			id: TeamAccessId::new(state.next_id()),
			team_id,
			user_id,
			scope: AccessScope::Book(book_id),
			mode,
		};
		state.accesses.push(access);
	}

	/// Insert an active, never-expiring subscription with the next id.
	pub fn subscribe(&self, owner: SubscriptionOwner, plan_id: PlanId) -> Subscription {
		let mut state = self.lock();
		let subscription = Subscription {
			id: SubscriptionId::new(state.next_id()),
			owner,
			plan_id,
			is_active: true,
			is_cancelled: false,
			expire_at: None,
			extendable: true,
			created_at: Utc::now(),
		};
		state.subscriptions.push(subscription.clone());
		subscription
	}

	pub fn set_expiry(&self, id: SubscriptionId, expire_at: Option<DateTime<Utc>>) {
		if let Some(sub) = self.lock().subscriptions.iter_mut().find(|s| s.id == id) {
			sub.expire_at = expire_at;
		}
	}

	pub fn deactivate_subscription(&self, id: SubscriptionId) {
		if let Some(sub) = self.lock().subscriptions.iter_mut().find(|s| s.id == id) {
			sub.is_active = false;
			sub.is_cancelled = true;
		}
	}

	pub fn set_usage(&self, team_id: TeamId, usage: Usage) {
		self.lock().usage.insert(team_id, usage);
	}

	pub fn set_personal_books(&self, user_id: UserId, count: u64) {
		self.lock().personal_books.insert(user_id, count);
	}

	/// Number of usage counter reads served so far.
	pub fn usage_reads(&self) -> usize {
		self.usage_reads.load(Ordering::SeqCst)
	}

	fn read_usage(&self, team_id: TeamId) -> Usage {
		self.usage_reads.fetch_add(1, Ordering::SeqCst);
		self.lock().usage.get(&team_id).copied().unwrap_or_default()
	}
}

#[async_trait]
impl TeamStore for InMemoryStore {
	async fn get_team(&self, team_id: TeamId) -> Result<Option<Team>, StoreError> {
		Ok(self.lock().teams.get(&team_id).cloned())
	}

	async fn get_member(
		&self,
		team_id: TeamId,
		user_id: UserId,
	) -> Result<Option<TeamMember>, StoreError> {
		Ok(self
			.lock()
			.members
			.iter()
			.find(|m| m.team_id == team_id && m.user_id == user_id)
			.cloned())
	}

	async fn get_book_access(
		&self,
		team_id: TeamId,
		user_id: UserId,
		book_id: BookId,
	) -> Result<Option<TeamAccess>, StoreError> {
		Ok(self
			.lock()
			.accesses
			.iter()
			.find(|a| {
				a.team_id == team_id && a.user_id == user_id && a.scope == AccessScope::Book(book_id)
			})
			.cloned())
	}
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
	async fn find_active_subscription(
		&self,
		owner: SubscriptionOwner,
		filter: &SubscriptionFilter,
	) -> Result<Option<Subscription>, StoreError> {
		Ok(self
			.lock()
			.subscriptions
			.iter()
			.filter(|s| s.owner == owner && s.is_active && filter.matches(s))
			.max_by_key(|s| s.id)
			.cloned())
	}
}

#[async_trait]
impl UsageStore for InMemoryStore {
	async fn count_personal_books(&self, user_id: UserId) -> Result<u64, StoreError> {
		self.usage_reads.fetch_add(1, Ordering::SeqCst);
		Ok(self.lock().personal_books.get(&user_id).copied().unwrap_or(0))
	}

	async fn count_team_books(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.read_usage(team_id).books)
	}

	async fn count_members(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.read_usage(team_id).members)
	}

	async fn count_clients(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.read_usage(team_id).clients)
	}

	async fn count_projects(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.read_usage(team_id).projects)
	}

	async fn count_tasks(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.read_usage(team_id).tasks)
	}

	async fn sum_attachment_sizes(&self, team_id: TeamId) -> Result<u64, StoreError> {
		Ok(self.read_usage(team_id).storage_bytes)
	}
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
	now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
	pub fn new(now: DateTime<Utc>) -> Self {
		Self { now: Mutex::new(now) }
	}

	pub fn set(&self, now: DateTime<Utc>) {
		*self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
		*now += by;
	}
}

impl Clock for FixedClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap_or_else(|p| p.into_inner())
	}
}
