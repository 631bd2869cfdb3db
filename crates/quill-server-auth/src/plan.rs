// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plan catalogue types.
//!
//! Plans are seeded by migration and never change at runtime. The server loads
//! them once at startup into a [`PlanCatalogue`] shared behind an `Arc`.
//!
//! Limits are stored as signed integers where `-1` means unlimited. They are
//! lifted into [`Limit`] on load so that callers never compare against the
//! sentinel directly.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::PlanId;

/// Raw column value meaning "no limit".
pub const UNLIMITED: i64 = -1;

/// A plan ceiling on a countable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Limit {
	Unlimited,
	Max(u64),
}

impl Limit {
	/// Lift a raw column value. Any negative value is treated as unlimited.
	pub fn from_raw(raw: i64) -> Self {
		if raw < 0 {
			Limit::Unlimited
		} else {
			Limit::Max(raw as u64)
		}
	}

	pub fn to_raw(self) -> i64 {
		match self {
			Limit::Unlimited => UNLIMITED,
			Limit::Max(n) => i64::try_from(n).unwrap_or(i64::MAX),
		}
	}

	pub fn is_unlimited(&self) -> bool {
		matches!(self, Limit::Unlimited)
	}

	/// Returns true if one more item may be added on top of `current`.
	///
	/// A count at or above the ceiling is full.
	pub fn has_room_for_another(&self, current: u64) -> bool {
		match self {
			Limit::Unlimited => true,
			Limit::Max(max) => current < *max,
		}
	}
}

impl From<i64> for Limit {
	fn from(raw: i64) -> Self {
		Limit::from_raw(raw)
	}
}

impl From<Limit> for i64 {
	fn from(limit: Limit) -> Self {
		limit.to_raw()
	}
}

impl fmt::Display for Limit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Limit::Unlimited => f.write_str("unlimited"),
			Limit::Max(n) => write!(f, "{n}"),
		}
	}
}

/// Numeric ceilings attached to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
	pub max_books: Limit,
	pub max_members: Limit,
	pub max_clients: Limit,
	pub max_projects: Limit,
	pub max_tasks: Limit,
	/// Total attachment bytes per team.
	pub max_size: Limit,
	/// Bytes per attachment.
	pub single_file_size: Limit,
}

impl PlanLimits {
	/// Limits with every ceiling removed.
	pub fn unlimited() -> Self {
		Self {
			max_books: Limit::Unlimited,
			max_members: Limit::Unlimited,
			max_clients: Limit::Unlimited,
			max_projects: Limit::Unlimited,
			max_tasks: Limit::Unlimited,
			max_size: Limit::Unlimited,
			single_file_size: Limit::Unlimited,
		}
	}
}

/// Stable code for each catalogue plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanCode {
	Free,
	Trial,
	TeamMonthly,
	TeamYearly,
}

impl PlanCode {
	pub fn all() -> &'static [PlanCode] {
		&[
			PlanCode::Free,
			PlanCode::Trial,
			PlanCode::TeamMonthly,
			PlanCode::TeamYearly,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			PlanCode::Free => "free",
			PlanCode::Trial => "trial",
			PlanCode::TeamMonthly => "team_monthly",
			PlanCode::TeamYearly => "team_yearly",
		}
	}

	/// Human-readable catalogue name.
	pub fn display_name(&self) -> &'static str {
		match self {
			PlanCode::Free => "Free Plan",
			PlanCode::Trial => "Trial Plan",
			PlanCode::TeamMonthly => "Team Plan Monthly",
			PlanCode::TeamYearly => "Team Plan Yearly",
		}
	}
}

impl fmt::Display for PlanCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PlanCode {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		PlanCode::all()
			.iter()
			.copied()
			.find(|code| code.as_str() == s)
			.ok_or(())
	}
}

/// A catalogue plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
	pub id: PlanId,
	pub code: PlanCode,
	pub name: String,
	pub limits: PlanLimits,
}

impl Plan {
	pub fn is_free(&self) -> bool {
		self.code == PlanCode::Free
	}
}

/// Immutable lookup of every plan, keyed by id with a secondary index by code.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalogue {
	by_id: HashMap<PlanId, Plan>,
	by_code: HashMap<PlanCode, PlanId>,
}

impl PlanCatalogue {
	pub fn new(plans: impl IntoIterator<Item = Plan>) -> Self {
		let mut by_id = HashMap::new();
		let mut by_code = HashMap::new();
		for plan in plans {
			by_code.insert(plan.code, plan.id);
			by_id.insert(plan.id, plan);
		}
		Self { by_id, by_code }
	}

	pub fn get(&self, id: PlanId) -> Option<&Plan> {
		self.by_id.get(&id)
	}

	pub fn by_code(&self, code: PlanCode) -> Option<&Plan> {
		self.by_code.get(&code).and_then(|id| self.by_id.get(id))
	}

	pub fn len(&self) -> usize {
		self.by_id.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_id.is_empty()
	}

	/// Plans ordered by id.
	pub fn plans(&self) -> Vec<&Plan> {
		let mut plans: Vec<&Plan> = self.by_id.values().collect();
		plans.sort_by_key(|p| p.id);
		plans
	}
}
