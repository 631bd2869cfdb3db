// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for team authorization.
//!
//! This module defines the foundational types used throughout the gate:
//!
//! - **ID newtypes**: Type-safe wrappers around integer row ids for different
//!   entity types ([`UserId`], [`TeamId`], [`BookId`], etc.) preventing
//!   accidental mixing
//! - **Team roles**: The global role catalogue ([`TeamRoleName`])
//! - **Access modes**: Book/project grant levels ([`AccessMode`])
//!
//! Row ids are assigned by the store and increase monotonically, so ordering by
//! id is a valid proxy for "most recently created".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Newtypes
// =============================================================================

/// Error returned when an id cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {value:?}")]
pub struct IdParseError {
	pub kind: &'static str,
	pub value: String,
}

macro_rules! define_id_type {
	($name:ident, $kind:literal, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Create a new ID from a row id.
			pub const fn new(id: i64) -> Self {
				Self(id)
			}

			/// Get the inner row id.
			pub const fn into_inner(self) -> i64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}

		impl FromStr for $name {
			type Err = IdParseError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				s.trim()
					.parse::<i64>()
					.ok()
					.filter(|id| *id > 0)
					.map(Self)
					.ok_or_else(|| IdParseError {
						kind: $kind,
						value: s.to_string(),
					})
			}
		}
	};
}

define_id_type!(UserId, "user", "Unique identifier for a user.");
define_id_type!(TeamId, "team", "Unique identifier for a team.");
define_id_type!(TeamMemberId, "team member", "Unique identifier for a team membership.");
define_id_type!(TeamAccessId, "team access", "Unique identifier for an access grant.");
define_id_type!(TeamClientId, "team client", "Unique identifier for a client-to-team link.");
define_id_type!(BookId, "book", "Unique identifier for a book.");
define_id_type!(ProjectId, "project", "Unique identifier for a project.");
define_id_type!(TaskId, "task", "Unique identifier for a task.");
define_id_type!(AttachmentId, "attachment", "Unique identifier for an attachment.");
define_id_type!(PlanId, "plan", "Unique identifier for a catalogue plan.");
define_id_type!(SubscriptionId, "subscription", "Unique identifier for a subscription.");

// =============================================================================
// Team Roles
// =============================================================================

/// Named roles within a team.
///
/// The catalogue is global and seeded by migration; it never changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamRoleName {
	/// Full control over the team, its members and billing.
	#[serde(rename = "admin")]
	Admin,
	/// Manages members and content, no billing.
	#[serde(rename = "super user")]
	SuperUser,
	/// Standard team member.
	#[serde(rename = "user")]
	User,
}

impl TeamRoleName {
	/// Returns all available team roles.
	pub fn all() -> &'static [TeamRoleName] {
		&[
			TeamRoleName::Admin,
			TeamRoleName::SuperUser,
			TeamRoleName::User,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			TeamRoleName::Admin => "admin",
			TeamRoleName::SuperUser => "super user",
			TeamRoleName::User => "user",
		}
	}
}

impl fmt::Display for TeamRoleName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for TeamRoleName {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(TeamRoleName::Admin),
			"super user" => Ok(TeamRoleName::SuperUser),
			"user" => Ok(TeamRoleName::User),
			_ => Err(()),
		}
	}
}

// =============================================================================
// Access Modes
// =============================================================================

/// Grant level on a book or project.
///
/// `Write` implies `Read`. Ordering follows that hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
	Read,
	Write,
}

impl AccessMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			AccessMode::Read => "read",
			AccessMode::Write => "write",
		}
	}

	/// Returns true if this mode grants at least the `required` mode.
	pub fn satisfies(&self, required: AccessMode) -> bool {
		*self >= required
	}
}

impl fmt::Display for AccessMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AccessMode {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"read" => Ok(AccessMode::Read),
			"write" => Ok(AccessMode::Write),
			_ => Err(()),
		}
	}
}
