// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team gate configuration.

use http::HeaderName;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_TEAM_HEADER: &str = "x-team-id";

#[derive(Debug, Clone)]
pub struct GateConfig {
	/// Request header naming the team the caller acts as. Always lowercase.
	pub team_header: String,
}

impl Default for GateConfig {
	fn default() -> Self {
		Self {
			team_header: DEFAULT_TEAM_HEADER.to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateConfigLayer {
	#[serde(default)]
	pub team_header: Option<String>,
}

impl GateConfigLayer {
	pub fn merge(&mut self, other: GateConfigLayer) {
		if other.team_header.is_some() {
			self.team_header = other.team_header;
		}
	}

	/// Validate the header name. [`HeaderName`] lowercases it.
	pub fn finalize(self) -> Result<GateConfig, ConfigError> {
		let Some(raw) = self.team_header else {
			return Ok(GateConfig::default());
		};

		let name = HeaderName::from_bytes(raw.trim().as_bytes()).map_err(|_| {
			ConfigError::InvalidValue {
				key: "gate.team_header".to_string(),
				message: format!("'{raw}' is not a valid header name"),
			}
		})?;

		Ok(GateConfig {
			team_header: name.as_str().to_string(),
		})
	}
}
