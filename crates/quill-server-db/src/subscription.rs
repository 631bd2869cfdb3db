// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subscription repository.
//!
//! Subscriptions are append-only for plan changes: [`SubscriptionRepository::change_plan`]
//! inserts a new row and retires the owner's previously active rows in the same
//! transaction, so the table keeps the full billing history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_server_auth::{
	PlanId, StoreError, Subscription, SubscriptionFilter, SubscriptionId, SubscriptionOwner,
	SubscriptionStore, TeamId, UserId,
};
use sqlx::{sqlite::SqlitePool, QueryBuilder, Row, Sqlite};

use crate::error::DbError;
use crate::types::{format_timestamp, parse_optional_timestamp, parse_timestamp};

const SUBSCRIPTION_COLUMNS: &str =
	"id, team_id, user_id, plan_id, is_active, is_cancelled, expire_at, extendable, created_at";

/// Fields for inserting a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
	pub owner: SubscriptionOwner,
	pub plan_id: PlanId,
	pub expire_at: Option<DateTime<Utc>>,
	pub extendable: bool,
}

impl NewSubscription {
	/// An extendable subscription that never expires.
	pub fn new(owner: SubscriptionOwner, plan_id: PlanId) -> Self {
		Self {
			owner,
			plan_id,
			expire_at: None,
			extendable: true,
		}
	}

	pub fn expiring_at(mut self, expire_at: DateTime<Utc>) -> Self {
		self.expire_at = Some(expire_at);
		self
	}
}

/// Owner column and bound id for a subscription owner.
fn owner_column(owner: SubscriptionOwner) -> (&'static str, i64) {
	match owner {
		SubscriptionOwner::Team(id) => ("team_id", id.into_inner()),
		SubscriptionOwner::User(id) => ("user_id", id.into_inner()),
	}
}

/// `SELECT` for the newest active row of `owner` narrowed by `filter`.
fn active_subscription_query(
	owner: SubscriptionOwner,
	filter: &SubscriptionFilter,
) -> QueryBuilder<'static, Sqlite> {
	let (column, owner_id) = owner_column(owner);
	let mut qb = QueryBuilder::new(format!(
		"SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE is_active = 1 AND {column} = "
	));
	qb.push_bind(owner_id);
	if let Some(now) = filter.not_expired_at() {
		qb.push(" AND (expire_at IS NULL OR expire_at > ");
		qb.push_bind(format_timestamp(now));
		qb.push(")");
	}
	qb.push(" ORDER BY id DESC LIMIT 1");
	qb
}

/// Repository for subscription database operations.
#[derive(Clone)]
pub struct SubscriptionRepository {
	pool: SqlitePool,
}

impl SubscriptionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a subscription without touching existing rows.
	#[tracing::instrument(skip(self, new), fields(owner = %new.owner, plan_id = %new.plan_id))]
	pub async fn create_subscription(&self, new: &NewSubscription) -> Result<Subscription, DbError> {
		let mut conn = self.pool.acquire().await?;
		let subscription = insert_subscription(&mut conn, new).await?;
		tracing::debug!(subscription_id = %subscription.id, "subscription created");
		Ok(subscription)
	}

	/// Move `new.owner` to a new plan.
	///
	/// Previously active rows are marked inactive and cancelled, then the new
	/// row is inserted, in one transaction.
	#[tracing::instrument(skip(self, new), fields(owner = %new.owner, plan_id = %new.plan_id))]
	pub async fn change_plan(&self, new: &NewSubscription) -> Result<Subscription, DbError> {
		let (column, owner_id) = owner_column(new.owner);
		let mut tx = self.pool.begin().await?;

		let retired = sqlx::query(&format!(
			"UPDATE subscriptions SET is_active = 0, is_cancelled = 1 WHERE {column} = ? AND is_active = 1"
		))
		.bind(owner_id)
		.execute(&mut *tx)
		.await?
		.rows_affected();

		let subscription = insert_subscription(&mut tx, new).await?;
		tx.commit().await?;

		tracing::info!(subscription_id = %subscription.id, retired, "plan changed");
		Ok(subscription)
	}

	/// The newest active subscription of `owner` matching `filter`.
	#[tracing::instrument(skip(self, filter), fields(owner = %owner))]
	pub async fn find_active_subscription(
		&self,
		owner: SubscriptionOwner,
		filter: &SubscriptionFilter,
	) -> Result<Option<Subscription>, DbError> {
		let row = active_subscription_query(owner, filter)
			.build()
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_subscription(&r)).transpose()
	}

	/// Every subscription of `owner`, newest first.
	#[tracing::instrument(skip(self), fields(owner = %owner))]
	pub async fn list_subscriptions(&self, owner: SubscriptionOwner) -> Result<Vec<Subscription>, DbError> {
		let (column, owner_id) = owner_column(owner);
		let rows = sqlx::query(&format!(
			"SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE {column} = ? ORDER BY id DESC"
		))
		.bind(owner_id)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_subscription).collect()
	}

	/// Set or clear the expiry of a subscription.
	#[tracing::instrument(skip(self), fields(subscription_id = %id))]
	pub async fn set_expiry(
		&self,
		id: SubscriptionId,
		expire_at: Option<DateTime<Utc>>,
	) -> Result<(), DbError> {
		let result = sqlx::query("UPDATE subscriptions SET expire_at = ? WHERE id = ?")
			.bind(expire_at.map(format_timestamp))
			.bind(id.into_inner())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("subscription {id}")));
		}
		Ok(())
	}
}

async fn insert_subscription(
	conn: &mut sqlx::SqliteConnection,
	new: &NewSubscription,
) -> Result<Subscription, DbError> {
	let now = Utc::now();
	let (team_id, user_id) = match new.owner {
		SubscriptionOwner::Team(id) => (Some(id.into_inner()), None),
		SubscriptionOwner::User(id) => (None, Some(id.into_inner())),
	};

	let id = sqlx::query(
		r#"
		INSERT INTO subscriptions (team_id, user_id, plan_id, is_active, is_cancelled, expire_at, extendable, created_at)
		VALUES (?, ?, ?, 1, 0, ?, ?, ?)
		"#,
	)
	.bind(team_id)
	.bind(user_id)
	.bind(new.plan_id.into_inner())
	.bind(new.expire_at.map(format_timestamp))
	.bind(new.extendable as i32)
	.bind(format_timestamp(now))
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();

	Ok(Subscription {
		id: SubscriptionId::new(id),
		owner: new.owner,
		plan_id: new.plan_id,
		is_active: true,
		is_cancelled: false,
		expire_at: new.expire_at,
		extendable: new.extendable,
		created_at: now,
	})
}

fn row_to_subscription(row: &sqlx::sqlite::SqliteRow) -> Result<Subscription, DbError> {
	let id: i64 = row.get("id");
	let team_id: Option<i64> = row.get("team_id");
	let user_id: Option<i64> = row.get("user_id");
	let is_active: i32 = row.get("is_active");
	let is_cancelled: i32 = row.get("is_cancelled");
	let extendable: i32 = row.get("extendable");
	let expire_at: Option<String> = row.get("expire_at");
	let created_at: String = row.get("created_at");

	let owner = match (team_id, user_id) {
		(Some(team_id), _) => SubscriptionOwner::Team(TeamId::new(team_id)),
		(None, Some(user_id)) => SubscriptionOwner::User(UserId::new(user_id)),
		(None, None) => {
			return Err(DbError::Internal(format!("Subscription {id} has no owner")));
		}
	};

	Ok(Subscription {
		id: SubscriptionId::new(id),
		owner,
		plan_id: PlanId::new(row.get("plan_id")),
		is_active: is_active != 0,
		is_cancelled: is_cancelled != 0,
		expire_at: parse_optional_timestamp(expire_at, "expire_at")?,
		extendable: extendable != 0,
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
	async fn find_active_subscription(
		&self,
		owner: SubscriptionOwner,
		filter: &SubscriptionFilter,
	) -> Result<Option<Subscription>, StoreError> {
		Ok(self.find_active_subscription(owner, filter).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::team::TeamRepository;
	use crate::testing::{create_migrated_test_pool, insert_user};
	use chrono::Duration;

	const FREE: PlanId = PlanId::new(1);
	const TRIAL: PlanId = PlanId::new(2);
	const MONTHLY: PlanId = PlanId::new(3);

	async fn setup() -> (SubscriptionRepository, SubscriptionOwner, UserId) {
		let pool = create_migrated_test_pool().await;
		let owner = insert_user(&pool, "owner@example.com", false).await;
		let team = TeamRepository::new(pool.clone()).create_team(owner, "Acme").await.unwrap();
		(SubscriptionRepository::new(pool), SubscriptionOwner::Team(team.id), owner)
	}

	#[tokio::test]
	async fn newest_active_row_wins_even_if_older_still_active() {
		let (repo, team, _) = setup().await;
		repo.create_subscription(&NewSubscription::new(team, FREE)).await.unwrap();
		let newer = repo.create_subscription(&NewSubscription::new(team, MONTHLY)).await.unwrap();

		let found = repo.find_active_subscription(team, &SubscriptionFilter::any()).await.unwrap().unwrap();
		assert_eq!(found.id, newer.id);
		assert_eq!(found.plan_id, MONTHLY);
	}

	#[tokio::test]
	async fn change_plan_keeps_history_and_single_active_row() {
		let (repo, team, _) = setup().await;
		let first = repo.create_subscription(&NewSubscription::new(team, FREE)).await.unwrap();
		let second = repo.change_plan(&NewSubscription::new(team, TRIAL)).await.unwrap();

		let history = repo.list_subscriptions(team).await.unwrap();
		assert_eq!(history.len(), 2);
		assert_eq!(history[0].id, second.id);
		assert!(history[0].is_active);
		assert_eq!(history[1].id, first.id);
		assert!(!history[1].is_active);
		assert!(history[1].is_cancelled);

		let active: Vec<_> = history.iter().filter(|s| s.is_active).collect();
		assert_eq!(active.len(), 1);
	}

	#[tokio::test]
	async fn non_expired_filter_skips_lapsed_rows() {
		let (repo, team, _) = setup().await;
		let now = Utc::now();
		let older = repo.create_subscription(&NewSubscription::new(team, FREE)).await.unwrap();
		repo
			.create_subscription(&NewSubscription::new(team, TRIAL).expiring_at(now - Duration::seconds(1)))
			.await
			.unwrap();

		let any = repo.find_active_subscription(team, &SubscriptionFilter::any()).await.unwrap().unwrap();
		assert_eq!(any.plan_id, TRIAL);
		assert!(any.is_expired_at(now));

		let live = repo
			.find_active_subscription(team, &SubscriptionFilter::non_expired_at(now))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(live.id, older.id);
	}

	#[tokio::test]
	async fn expiry_round_trips() {
		let (repo, team, _) = setup().await;
		let sub = repo.create_subscription(&NewSubscription::new(team, MONTHLY)).await.unwrap();
		let at = Utc::now() + Duration::days(30);
		repo.set_expiry(sub.id, Some(at)).await.unwrap();

		let found = repo.find_active_subscription(team, &SubscriptionFilter::any()).await.unwrap().unwrap();
		let stored = found.expire_at.unwrap();
		assert!((stored - at).num_milliseconds().abs() < 1);
	}

	#[tokio::test]
	async fn set_expiry_on_missing_row_is_not_found() {
		let (repo, _, _) = setup().await;
		let err = repo.set_expiry(SubscriptionId::new(404), None).await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn user_and_team_subscriptions_are_separate() {
		let (repo, team, owner) = setup().await;
		let user = SubscriptionOwner::User(owner);
		repo.create_subscription(&NewSubscription::new(team, MONTHLY)).await.unwrap();
		repo.create_subscription(&NewSubscription::new(user, TRIAL)).await.unwrap();

		let personal = repo.find_active_subscription(user, &SubscriptionFilter::any()).await.unwrap().unwrap();
		assert_eq!(personal.owner, user);
		assert_eq!(personal.plan_id, TRIAL);

		repo.change_plan(&NewSubscription::new(user, FREE)).await.unwrap();
		let team_sub = repo.find_active_subscription(team, &SubscriptionFilter::any()).await.unwrap().unwrap();
		assert_eq!(team_sub.plan_id, MONTHLY);
	}

	#[tokio::test]
	async fn no_rows_is_none() {
		let (repo, team, _) = setup().await;
		assert!(repo.find_active_subscription(team, &SubscriptionFilter::any()).await.unwrap().is_none());
	}
}
