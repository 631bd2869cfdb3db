// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team-scoped request gate.
//!
//! # Evaluation order
//!
//! ```text
//! team header? ── none ──> required? ── no ──> allow, no team context
//!      │                       └── yes ─> TeamNotFound
//!      v
//! load team ──────────────── missing ──> TeamNotFound
//!      v
//! non-client: load member ── missing ──> MemberNotFound
//!      v
//! book id? ─> grant mode >= required ─ no ─> PermissionDenied
//!      v
//! client and clients denied ──────────> PermissionDenied
//!      v
//! role allow-list ─ role not listed ──> PermissionDenied
//!      v
//! subscription check? ─> active plan ─ none ──> NoActiveSubscription
//!                          free and free denied ─> PermissionDenied
//!                          expired ───────────────> SubscriptionExpired
//!      v
//! allow with team context
//! ```
//!
//! The first failing step rejects; later steps are not evaluated.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{DenyReason, GateError, Result};
use crate::quota::QuotaChecker;
use crate::store::{Clock, TeamStore};
use crate::subscription::{ActivePlan, SubscriptionOwner, SubscriptionResolver};
use crate::team::{Team, TeamMember};
use crate::types::{AccessMode, BookId, TeamId, TeamRoleName};
use crate::user::User;

/// Per-route gate configuration.
///
/// Built once when the router is assembled and shared by every request to the
/// route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOptions {
	/// Allowed member roles. `None` admits every role.
	pub roles: Option<Vec<TeamRoleName>>,
	/// Reject requests that carry no team header.
	pub required: bool,
	pub allow_client: bool,
	pub allow_for_free: bool,
	/// Book-scoped requests need a write grant. When false a read grant is
	/// enough and clients are capped at read.
	pub has_full_access: bool,
	pub check_subscription: bool,
}

impl Default for GateOptions {
	fn default() -> Self {
		Self {
			roles: None,
			required: false,
			allow_client: true,
			allow_for_free: true,
			has_full_access: true,
			check_subscription: true,
		}
	}
}

impl GateOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	pub fn roles(mut self, roles: impl IntoIterator<Item = TeamRoleName>) -> Self {
		self.roles = Some(roles.into_iter().collect());
		self
	}

	pub fn deny_clients(mut self) -> Self {
		self.allow_client = false;
		self
	}

	pub fn deny_free(mut self) -> Self {
		self.allow_for_free = false;
		self
	}

	pub fn read_only(mut self) -> Self {
		self.has_full_access = false;
		self
	}

	pub fn skip_subscription(mut self) -> Self {
		self.check_subscription = false;
		self
	}

	/// Mode a book grant must satisfy, for members and clients alike. Clients
	/// are additionally capped at `read` on routes without full access.
	pub fn required_mode(&self) -> AccessMode {
		if self.has_full_access {
			AccessMode::Write
		} else {
			AccessMode::Read
		}
	}
}

/// A team the request was resolved against.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTeam {
	pub team: Team,
	/// `None` for clients, who act without a membership row.
	pub member: Option<TeamMember>,
	/// Effective mode on the requested book, after the client cap.
	pub book_access: Option<AccessMode>,
	/// `None` when the route skips the subscription check.
	pub plan: Option<ActivePlan>,
}

/// Outcome of a successful gate evaluation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TeamContext(Option<ResolvedTeam>);

impl TeamContext {
	/// No team header was sent and none was required.
	pub fn none() -> Self {
		Self(None)
	}

	pub fn resolved(team: ResolvedTeam) -> Self {
		Self(Some(team))
	}

	pub fn get(&self) -> Option<&ResolvedTeam> {
		self.0.as_ref()
	}

	pub fn into_inner(self) -> Option<ResolvedTeam> {
		self.0
	}

	pub fn is_none(&self) -> bool {
		self.0.is_none()
	}

	pub fn team(&self) -> Option<&Team> {
		self.0.as_ref().map(|r| &r.team)
	}

	pub fn team_id(&self) -> Option<TeamId> {
		self.team().map(|t| t.id)
	}

	pub fn member(&self) -> Option<&TeamMember> {
		self.0.as_ref().and_then(|r| r.member.as_ref())
	}

	pub fn plan(&self) -> Option<&ActivePlan> {
		self.0.as_ref().and_then(|r| r.plan.as_ref())
	}
}

/// Resolves team, membership, book access and subscription for a request.
#[derive(Clone)]
pub struct AccessResolver {
	teams: Arc<dyn TeamStore>,
	subscriptions: SubscriptionResolver,
	clock: Arc<dyn Clock>,
}

impl AccessResolver {
	pub fn new(
		teams: Arc<dyn TeamStore>,
		subscriptions: SubscriptionResolver,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			teams,
			subscriptions,
			clock,
		}
	}

	/// Evaluate the gate for `user`.
	///
	/// `team_header` is the parsed team header, `book_id` the book named by the
	/// request path or query, if any.
	#[tracing::instrument(
		skip_all,
		fields(user_id = %user.id, team_id = ?team_header, book_id = ?book_id, is_client = user.is_client)
	)]
	pub async fn resolve(
		&self,
		user: &User,
		team_header: Option<TeamId>,
		book_id: Option<BookId>,
		options: &GateOptions,
	) -> Result<TeamContext> {
		match self.evaluate(user, team_header, book_id, options).await {
			Ok(context) => {
				tracing::debug!(resolved = !context.is_none(), "gate allowed");
				Ok(context)
			}
			Err(err) if err.is_rejection() => {
				tracing::info!(code = err.code(), reason = %err, "gate denied");
				Err(err)
			}
			Err(err) => {
				tracing::error!(error = %err, "gate failed");
				Err(err)
			}
		}
	}

	async fn evaluate(
		&self,
		user: &User,
		team_header: Option<TeamId>,
		book_id: Option<BookId>,
		options: &GateOptions,
	) -> Result<TeamContext> {
		let Some(team_id) = team_header else {
			return if options.required {
				Err(GateError::TeamNotFound)
			} else {
				Ok(TeamContext::none())
			};
		};

		let team = self
			.teams
			.get_team(team_id)
			.await?
			.ok_or(GateError::TeamNotFound)?;

		let member = if user.is_client() {
			None
		} else {
			Some(
				self
					.teams
					.get_member(team_id, user.id)
					.await?
					.ok_or(GateError::MemberNotFound)?,
			)
		};

		let book_access = match book_id {
			Some(book_id) => Some(self.check_book_access(user, team_id, book_id, options).await?),
			None => None,
		};

		if user.is_client() && !options.allow_client {
			return Err(GateError::PermissionDenied(DenyReason::ClientNotAllowed));
		}

		if let Some(roles) = &options.roles {
			let allowed = member.as_ref().is_some_and(|m| m.has_any_role(roles));
			if !allowed {
				return Err(GateError::PermissionDenied(DenyReason::RoleNotAllowed));
			}
		}

		let plan = if options.check_subscription {
			Some(self.check_subscription(team_id, options).await?)
		} else {
			None
		};

		Ok(TeamContext::resolved(ResolvedTeam {
			team,
			member,
			book_access,
			plan,
		}))
	}

	async fn check_book_access(
		&self,
		user: &User,
		team_id: TeamId,
		book_id: BookId,
		options: &GateOptions,
	) -> Result<AccessMode> {
		let grant = self
			.teams
			.get_book_access(team_id, user.id, book_id)
			.await?
			.ok_or(GateError::PermissionDenied(DenyReason::InsufficientAccess))?;

		let effective = if user.is_client() && !options.has_full_access {
			grant.mode.min(AccessMode::Read)
		} else {
			grant.mode
		};

		if effective.satisfies(options.required_mode()) {
			Ok(effective)
		} else {
			Err(GateError::PermissionDenied(DenyReason::InsufficientAccess))
		}
	}

	async fn check_subscription(&self, team_id: TeamId, options: &GateOptions) -> Result<ActivePlan> {
		let active = self
			.subscriptions
			.get_active_plan(SubscriptionOwner::Team(team_id))
			.await?;

		if !options.allow_for_free && active.is_free() {
			return Err(GateError::PermissionDenied(DenyReason::FreePlanNotAllowed));
		}

		if active.subscription.is_expired_at(self.clock.now()) {
			return Err(GateError::SubscriptionExpired);
		}

		Ok(active)
	}
}

/// The request gate: access resolution plus the quota checker handlers call
/// after the gate passes.
#[derive(Clone)]
pub struct TeamGate {
	access: AccessResolver,
	quota: QuotaChecker,
}

impl TeamGate {
	pub fn new(access: AccessResolver, quota: QuotaChecker) -> Self {
		Self { access, quota }
	}

	/// Wire every component to the same stores.
	pub fn from_parts(
		teams: Arc<dyn TeamStore>,
		subscriptions: SubscriptionResolver,
		usage: Arc<dyn crate::store::UsageStore>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let access = AccessResolver::new(teams, subscriptions.clone(), clock);
		let quota = QuotaChecker::new(usage, subscriptions);
		Self::new(access, quota)
	}

	pub async fn resolve(
		&self,
		user: &User,
		team_header: Option<TeamId>,
		book_id: Option<BookId>,
		options: &GateOptions,
	) -> Result<TeamContext> {
		self.access.resolve(user, team_header, book_id, options).await
	}

	pub fn quota(&self) -> &QuotaChecker {
		&self.quota
	}
}
