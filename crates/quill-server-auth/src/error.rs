// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gate rejection taxonomy.
//!
//! Every rejection the gate produces is a [`GateError`]. Each variant carries a
//! stable machine code and an HTTP status so that the server can turn it into
//! a `{ message, code }` response without inspecting the message text.

use std::fmt;

/// Error surfaced by a store implementation.
///
/// Store backends convert their own errors into this so the gate does not
/// depend on any particular database crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

/// Why a [`GateError::PermissionDenied`] was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
	/// No grant on the book, or the grant's mode is below the required one.
	InsufficientAccess,
	/// The route does not admit client users.
	ClientNotAllowed,
	/// The member's role is not in the route's allow-list.
	RoleNotAllowed,
	/// The route is closed to teams on the Free plan.
	FreePlanNotAllowed,
}

impl DenyReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			DenyReason::InsufficientAccess => "insufficient_access",
			DenyReason::ClientNotAllowed => "client_not_allowed",
			DenyReason::RoleNotAllowed => "role_not_allowed",
			DenyReason::FreePlanNotAllowed => "free_plan_not_allowed",
		}
	}
}

impl fmt::Display for DenyReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A countable resource bounded by a plan limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
	Books,
	Members,
	Clients,
	Projects,
	Tasks,
	/// A single attachment larger than the plan's per-file ceiling.
	FileSize,
	/// Total attachment bytes for the team.
	Storage,
}

impl Resource {
	pub fn as_str(&self) -> &'static str {
		match self {
			Resource::Books => "books",
			Resource::Members => "members",
			Resource::Clients => "clients",
			Resource::Projects => "projects",
			Resource::Tasks => "tasks",
			Resource::FileSize => "file_size",
			Resource::Storage => "storage",
		}
	}
}

impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Rejection produced by the access resolver, subscription resolver or quota
/// checker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
	#[error("team not found")]
	TeamNotFound,

	#[error("you are not a member of this team")]
	MemberNotFound,

	#[error("permission denied: {0}")]
	PermissionDenied(DenyReason),

	#[error("subscription has expired")]
	SubscriptionExpired,

	#[error("no active subscription")]
	NoActiveSubscription,

	#[error("plan limit reached for {0}")]
	QuotaExceeded(Resource),

	#[error("internal error: {0}")]
	Store(String),
}

impl GateError {
	/// HTTP status the rejection maps to.
	pub fn status_code(&self) -> u16 {
		match self {
			GateError::Store(_) => 500,
			_ => 403,
		}
	}

	/// Stable machine-readable code for clients to branch on.
	pub fn code(&self) -> &'static str {
		match self {
			GateError::TeamNotFound => "team_not_found",
			GateError::MemberNotFound => "member_not_found",
			GateError::PermissionDenied(_) => "permission_denied",
			GateError::SubscriptionExpired => "subscription_expired",
			GateError::NoActiveSubscription => "no_active_subscription",
			GateError::QuotaExceeded(_) => "quota_exceeded",
			GateError::Store(_) => "internal_error",
		}
	}

	/// Returns true for rejections that are the caller's fault rather than a
	/// backend failure.
	pub fn is_rejection(&self) -> bool {
		!matches!(self, GateError::Store(_))
	}
}

impl From<StoreError> for GateError {
	fn from(err: StoreError) -> Self {
		GateError::Store(err.0)
	}
}

pub type Result<T> = std::result::Result<T, GateError>;
