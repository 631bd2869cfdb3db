// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Quill workspace server.
//!
//! Every `/api` route runs behind bearer-token authentication and a team gate
//! configured for that route group. Handlers receive the resolved
//! [`quill_server_auth::TeamContext`] and run the matching quota check before
//! writing.

pub mod api;
pub mod auth_middleware;
pub mod error;
pub mod routes;
pub mod team_gate;
pub mod version;

pub use api::{create_app_state, create_router, AppState};
pub use error::{ErrorResponse, ServerError};
pub use quill_server_config::ServerConfig;
