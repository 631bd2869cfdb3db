// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod database;
mod gate;
mod http;
mod logging;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use gate::{GateConfig, GateConfigLayer, DEFAULT_TEAM_HEADER};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
