// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database configuration. Quill runs on SQLite only, so the URL must use the
//! `sqlite:` scheme.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_DATABASE_URL: &str = "sqlite:./quill.db";
const SQLITE_SCHEME: &str = "sqlite:";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_DATABASE_URL.to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	/// Resolve the URL, rejecting empty values and non-SQLite schemes.
	pub fn finalize(self) -> Result<DatabaseConfig, ConfigError> {
		let url = match self.url {
			Some(url) => url.trim().to_string(),
			None => return Ok(DatabaseConfig::default()),
		};

		if url.is_empty() {
			return Err(ConfigError::Validation(
				"database.url must not be empty".to_string(),
			));
		}

		let scheme_matches = url
			.get(..SQLITE_SCHEME.len())
			.is_some_and(|prefix| prefix.eq_ignore_ascii_case(SQLITE_SCHEME));
		if !scheme_matches {
			return Err(ConfigError::InvalidValue {
				key: "database.url".to_string(),
				message: format!("'{url}' is not a sqlite: URL"),
			});
		}

		Ok(DatabaseConfig { url })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_url() {
		let config = DatabaseConfigLayer::default().finalize().unwrap();
		assert_eq!(config.url, "sqlite:./quill.db");
	}

	#[test]
	fn test_sqlite_urls_accepted_and_trimmed() {
		for (raw, expected) in [
			(" sqlite:/var/lib/quill/data.db ", "sqlite:/var/lib/quill/data.db"),
			("sqlite::memory:", "sqlite::memory:"),
			("SQLite:quill.db?mode=rwc", "SQLite:quill.db?mode=rwc"),
		] {
			let layer = DatabaseConfigLayer {
				url: Some(raw.to_string()),
			};
			assert_eq!(layer.finalize().unwrap().url, expected);
		}
	}

	#[test]
	fn test_other_schemes_rejected() {
		for raw in ["postgres://localhost/quill", "./quill.db", "sqlite"] {
			let layer = DatabaseConfigLayer {
				url: Some(raw.to_string()),
			};
			let err = layer.finalize().unwrap_err();
			assert!(
				matches!(&err, ConfigError::InvalidValue { key, .. } if key == "database.url"),
				"{raw}: {err}"
			);
		}
	}

	#[test]
	fn test_blank_url_rejected() {
		let layer = DatabaseConfigLayer {
			url: Some("   ".to_string()),
		};
		assert!(matches!(layer.finalize(), Err(ConfigError::Validation(_))));
	}
}
