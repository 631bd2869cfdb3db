// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team-scoped handlers. All of them run behind a `required` gate.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use quill_server_auth::{Plan, Subscription, TeamClient, TeamId, TeamMember, TeamRoleName, UserId};
use quill_server_db::Project;
use serde::{Deserialize, Serialize};

use crate::{api::AppState, error::ServerError, team_gate::CurrentTeam};

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponse {
	pub team_id: TeamId,
	pub plan: Plan,
	pub subscription: Subscription,
}

/// GET /api/team/plan - The team's active plan and its limits.
pub async fn get_plan(team: CurrentTeam) -> Result<Json<PlanResponse>, ServerError> {
	let team_id = team.team_id()?;
	let active = team
		.0
		.plan()
		.cloned()
		.ok_or_else(|| ServerError::Internal("plan not resolved by gate".to_string()))?;

	Ok(Json(PlanResponse {
		team_id,
		plan: active.plan,
		subscription: active.subscription,
	}))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
	pub user_id: UserId,
	#[serde(default)]
	pub role: Option<String>,
	#[serde(default)]
	pub has_billing_access: bool,
}

/// POST /api/team/members - Add a member, subject to the plan's member limit.
pub async fn add_member(
	State(state): State<AppState>,
	team: CurrentTeam,
	Json(payload): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let team_id = team.team_id()?;
	let role = match payload.role.as_deref() {
		Some(raw) => raw.parse::<TeamRoleName>().map_err(|_| {
			ServerError::bad_request("invalid_role", format!("unknown team role {raw:?}"))
		})?,
		None => TeamRoleName::User,
	};

	let user = state
		.user_repo
		.get_user(payload.user_id)
		.await?
		.ok_or_else(|| ServerError::NotFound(format!("user {}", payload.user_id)))?;
	if user.is_client() {
		return Err(ServerError::bad_request(
			"client_not_member",
			"clients are linked through /api/team/clients",
		));
	}

	state.gate.quota().check_members(team_id).await?;

	let member: TeamMember = state
		.team_repo
		.add_member(team_id, user.id, role, payload.has_billing_access)
		.await?;
	tracing::info!(team_id = %team_id, user_id = %user.id, role = %role.as_str(), "member added");
	Ok((StatusCode::CREATED, Json(member)))
}

#[derive(Debug, Deserialize)]
pub struct AddClientRequest {
	pub user_id: UserId,
}

/// POST /api/team/clients - Link a client account, subject to the client limit.
pub async fn add_client(
	State(state): State<AppState>,
	team: CurrentTeam,
	Json(payload): Json<AddClientRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let team_id = team.team_id()?;
	let user = state
		.user_repo
		.get_user(payload.user_id)
		.await?
		.ok_or_else(|| ServerError::NotFound(format!("user {}", payload.user_id)))?;
	if !user.is_client() {
		return Err(ServerError::bad_request(
			"not_a_client",
			format!("user {} is not a client account", user.id),
		));
	}

	state.gate.quota().check_clients(team_id).await?;

	let client: TeamClient = state.team_repo.add_client(team_id, user.id).await?;
	tracing::info!(team_id = %team_id, user_id = %user.id, "client linked");
	Ok((StatusCode::CREATED, Json(client)))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
	pub name: String,
}

/// POST /api/team/projects - Create a project, subject to the project limit.
pub async fn create_project(
	State(state): State<AppState>,
	team: CurrentTeam,
	Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let team_id = team.team_id()?;
	let name = payload.name.trim();
	if name.is_empty() {
		return Err(ServerError::bad_request("invalid_name", "project name is required"));
	}

	state.gate.quota().check_projects(team_id).await?;

	let project: Project = state.content_repo.create_project(team_id, name).await?;
	Ok((StatusCode::CREATED, Json(project)))
}
