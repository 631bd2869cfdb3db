// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User types as seen by the gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// An authenticated user.
///
/// Clients (`is_client = true`) are restricted external actors. They need no
/// membership row, and unless a route grants full access they are capped at
/// read mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub email: String,
	pub display_name: String,
	pub is_client: bool,
	pub created_at: DateTime<Utc>,
}

impl User {
	pub fn is_client(&self) -> bool {
		self.is_client
	}
}
