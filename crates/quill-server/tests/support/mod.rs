// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	body::Body,
	http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method, Request, StatusCode},
	Router,
};
use chrono::{DateTime, Utc};
use quill_server::{create_app_state, create_router, AppState, ServerConfig};
use quill_server_auth::{
	generate_api_token, hash_token, AccessMode, AccessScope, BookId, PlanCode, Subscription,
	SubscriptionOwner, Team, TeamId, TeamRoleName, User,
};
use quill_server_db::{Book, NewBook, NewSubscription, PlanRepository};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Debug, Clone)]
pub struct TestUser {
	pub user: User,
	pub token: String,
}

pub struct TestApp {
	pub router: Router,
	pub state: AppState,
	_temp_dir: TempDir,
}

pub struct Response {
	pub status: StatusCode,
	pub body: Value,
}

impl Response {
	pub fn code(&self) -> &str {
		self.body["code"].as_str().unwrap_or_default()
	}
}

impl TestApp {
	pub async fn new() -> Self {
		let temp_dir = tempfile::tempdir().unwrap();
		let db_path = temp_dir.path().join("test_gate.db");
		let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
		let pool = quill_server_db::create_pool(&db_url).await.unwrap();
		quill_server_db::run_migrations(&pool).await.unwrap();

		let state = create_app_state(pool, &ServerConfig::default()).await.unwrap();
		let router = create_router(state.clone());

		Self {
			router,
			state,
			_temp_dir: temp_dir,
		}
	}

	pub async fn user(&self, email: &str) -> TestUser {
		self.account(email, false).await
	}

	pub async fn client(&self, email: &str) -> TestUser {
		self.account(email, true).await
	}

	async fn account(&self, email: &str, is_client: bool) -> TestUser {
		let user = self
			.state
			.user_repo
			.create_user(email, email, is_client)
			.await
			.unwrap();
		let token = generate_api_token();
		self
			.state
			.user_repo
			.create_api_token(user.id, &hash_token(&token), None)
			.await
			.unwrap();
		TestUser { user, token }
	}

	/// A team owned by `owner` on `plan`.
	pub async fn team(&self, owner: &TestUser, plan: PlanCode) -> (Team, Subscription) {
		let team = self
			.state
			.team_repo
			.create_team(owner.user.id, "Acme")
			.await
			.unwrap();
		let subscription = self.subscribe(SubscriptionOwner::Team(team.id), plan).await;
		(team, subscription)
	}

	pub async fn subscribe(&self, owner: SubscriptionOwner, plan: PlanCode) -> Subscription {
		let catalogue = PlanRepository::new(self.state.pool.clone())
			.load_catalogue()
			.await
			.unwrap();
		let plan_id = catalogue.by_code(plan).unwrap().id;
		self
			.state
			.subscription_repo
			.create_subscription(&NewSubscription::new(owner, plan_id))
			.await
			.unwrap()
	}

	pub async fn expire(&self, subscription: &Subscription, at: DateTime<Utc>) {
		self
			.state
			.subscription_repo
			.set_expiry(subscription.id, Some(at))
			.await
			.unwrap();
	}

	pub async fn add_member(&self, team: TeamId, user: &TestUser, role: TeamRoleName) {
		self
			.state
			.team_repo
			.add_member(team, user.user.id, role, false)
			.await
			.unwrap();
	}

	pub async fn link_client(&self, team: TeamId, client: &TestUser) {
		self
			.state
			.team_repo
			.add_client(team, client.user.id)
			.await
			.unwrap();
	}

	/// A team book owned by `owner` with a write grant for them.
	pub async fn team_book(&self, team: TeamId, owner: &TestUser) -> Book {
		let book = self
			.state
			.content_repo
			.create_book(&NewBook::new("Manuscript", owner.user.id, Some(team)))
			.await
			.unwrap();
		self.grant(team, owner, book.id, AccessMode::Write).await;
		book
	}

	pub async fn delete_book(&self, book: &Book) {
		assert!(self.state.content_repo.soft_delete_book(book.id).await.unwrap());
	}

	pub async fn grant(&self, team: TeamId, user: &TestUser, book: BookId, mode: AccessMode) {
		self
			.state
			.team_repo
			.grant_access(team, user.user.id, AccessScope::Book(book), mode)
			.await
			.unwrap();
	}

	pub async fn get(&self, path: &str, user: Option<&TestUser>, team: Option<TeamId>) -> Response {
		self.send(Method::GET, path, user, team, None).await
	}

	pub async fn post(
		&self,
		path: &str,
		user: Option<&TestUser>,
		team: Option<TeamId>,
		body: Value,
	) -> Response {
		self.send(Method::POST, path, user, team, Some(body)).await
	}

	pub async fn send(
		&self,
		method: Method,
		path: &str,
		user: Option<&TestUser>,
		team: Option<TeamId>,
		body: Option<Value>,
	) -> Response {
		let mut builder = Request::builder().method(method).uri(path);
		if let Some(user) = user {
			builder = builder.header(AUTHORIZATION, format!("Bearer {}", user.token));
		}
		if let Some(team) = team {
			builder = builder.header("x-team-id", team.to_string());
		}
		let request = match body {
			Some(body) => builder
				.header(CONTENT_TYPE, "application/json")
				.body(Body::from(body.to_string()))
				.unwrap(),
			None => builder.body(Body::empty()).unwrap(),
		};
		self.send_request(request).await
	}

	pub async fn send_request(&self, request: Request<Body>) -> Response {
		let response = self.router.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
		Response { status, body }
	}
}
