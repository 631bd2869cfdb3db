// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, post},
	Router,
};
use quill_server_auth::{
	GateOptions, SubscriptionResolver, SystemClock, TeamGate, TeamRoleName,
};
use quill_server_config::ServerConfig;
use quill_server_db::{
	ContentRepository, PlanRepository, SubscriptionRepository, TeamRepository, UsageRepository,
	UserRepository,
};
use sqlx::SqlitePool;

use crate::{
	auth_middleware::require_auth_layer,
	error::ServerError,
	routes,
	team_gate::{team_gate_layer, RouteGate},
};

#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub gate: TeamGate,
	pub user_repo: Arc<UserRepository>,
	pub team_repo: Arc<TeamRepository>,
	pub content_repo: Arc<ContentRepository>,
	pub subscription_repo: Arc<SubscriptionRepository>,
	/// Lowercase name of the header carrying the team id.
	pub team_header: Arc<str>,
}

/// Build the application state. Loads the plan catalogue once.
pub async fn create_app_state(
	pool: SqlitePool,
	config: &ServerConfig,
) -> Result<AppState, ServerError> {
	let catalogue = PlanRepository::new(pool.clone()).load_catalogue().await?;

	let team_repo = Arc::new(TeamRepository::new(pool.clone()));
	let subscription_repo = Arc::new(SubscriptionRepository::new(pool.clone()));
	let subscriptions = SubscriptionResolver::new(subscription_repo.clone(), Arc::new(catalogue));
	let gate = TeamGate::from_parts(
		team_repo.clone(),
		subscriptions,
		Arc::new(UsageRepository::new(pool.clone())),
		Arc::new(SystemClock),
	);

	Ok(AppState {
		gate,
		user_repo: Arc::new(UserRepository::new(pool.clone())),
		team_repo,
		content_repo: Arc::new(ContentRepository::new(pool.clone())),
		subscription_repo,
		team_header: Arc::from(config.gate.team_header.as_str()),
		pool,
	})
}

fn gated(state: &AppState, routes: Router<AppState>, options: GateOptions) -> Router<AppState> {
	routes.route_layer(from_fn_with_state(
		RouteGate::new(state.clone(), options),
		team_gate_layer,
	))
}

fn api_routes(state: &AppState) -> Router<AppState> {
	let team_admin = GateOptions::new()
		.required()
		.roles([TeamRoleName::Admin, TeamRoleName::SuperUser])
		.deny_clients();

	let team = Router::new()
		.route("/team/plan", get(routes::team::get_plan))
		.route("/team/projects", post(routes::team::create_project));

	let admin = Router::new()
		.route("/team/members", post(routes::team::add_member))
		.route("/team/clients", post(routes::team::add_client));

	let book_create = Router::new().route("/books", post(routes::books::create_book));

	let book_write = Router::new()
		.route("/books/{book_id}/tasks", post(routes::books::create_task))
		.route(
			"/books/{book_id}/attachments",
			post(routes::books::create_attachment),
		);

	let book_read = Router::new().route("/books/{book_id}", get(routes::books::get_book));

	Router::new()
		.merge(gated(state, team, GateOptions::new().required()))
		.merge(gated(state, admin, team_admin))
		.merge(gated(state, book_create, GateOptions::new().deny_free()))
		.merge(gated(state, book_write, GateOptions::new().required()))
		.merge(gated(
			state,
			book_read,
			GateOptions::new().required().read_only(),
		))
		.layer(from_fn_with_state(state.clone(), require_auth_layer))
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.nest("/api", api_routes(&state))
		.with_state(state)
}
