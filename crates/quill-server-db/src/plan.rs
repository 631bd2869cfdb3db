// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use quill_server_auth::{Limit, Plan, PlanCatalogue, PlanCode, PlanId, PlanLimits};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;

/// Read access to the seeded plan catalogue.
#[derive(Clone)]
pub struct PlanRepository {
	pool: SqlitePool,
}

impl PlanRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_plans(&self) -> Result<Vec<Plan>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, code, name, max_books, max_members, max_clients, max_projects,
				max_tasks, max_size, single_file_size
			FROM plans
			ORDER BY id
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_plan).collect()
	}

	/// Load every plan into an immutable catalogue. Called once at startup.
	#[tracing::instrument(skip(self))]
	pub async fn load_catalogue(&self) -> Result<PlanCatalogue, DbError> {
		let plans = self.list_plans().await?;
		if plans.is_empty() {
			return Err(DbError::Internal("plan catalogue is empty".to_string()));
		}
		tracing::info!(plans = plans.len(), "plan catalogue loaded");
		Ok(PlanCatalogue::new(plans))
	}
}

fn row_to_plan(row: &sqlx::sqlite::SqliteRow) -> Result<Plan, DbError> {
	let id: i64 = row.get("id");
	let code: String = row.get("code");
	let code = code
		.parse::<PlanCode>()
		.map_err(|_| DbError::Internal(format!("Unknown plan code for plan {id}: {code}")))?;
	let limit = |column: &str| Limit::from_raw(row.get::<i64, _>(column));

	Ok(Plan {
		id: PlanId::new(id),
		code,
		name: row.get("name"),
		limits: PlanLimits {
			max_books: limit("max_books"),
			max_members: limit("max_members"),
			max_clients: limit("max_clients"),
			max_projects: limit("max_projects"),
			max_tasks: limit("max_tasks"),
			max_size: limit("max_size"),
			single_file_size: limit("single_file_size"),
		},
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_migrated_test_pool;
	use quill_server_auth::testing::sample_catalogue;

	#[tokio::test]
	async fn seeded_catalogue_matches_fixture() {
		let pool = create_migrated_test_pool().await;
		let catalogue = PlanRepository::new(pool).load_catalogue().await.unwrap();
		let fixture = sample_catalogue();

		assert_eq!(catalogue.len(), 4);
		for plan in fixture.plans() {
			assert_eq!(catalogue.get(plan.id), Some(plan));
		}
	}

	#[tokio::test]
	async fn negative_limits_load_as_unlimited() {
		let pool = create_migrated_test_pool().await;
		let catalogue = PlanRepository::new(pool).load_catalogue().await.unwrap();
		let monthly = catalogue.by_code(PlanCode::TeamMonthly).unwrap();

		assert!(monthly.limits.max_books.is_unlimited());
		assert_eq!(monthly.limits.max_members, Limit::Max(25));
	}

	#[tokio::test]
	async fn unknown_code_is_rejected() {
		let pool = create_migrated_test_pool().await;
		sqlx::query(
			"INSERT INTO plans (id, code, name, max_books, max_members, max_clients, max_projects, max_tasks, max_size, single_file_size)
			VALUES (9, 'enterprise', 'Enterprise', -1, -1, -1, -1, -1, -1, -1)",
		)
		.execute(&pool)
		.await
		.unwrap();

		let err = PlanRepository::new(pool).list_plans().await.unwrap_err();
		assert!(err.to_string().contains("enterprise"));
	}

	#[tokio::test]
	async fn empty_catalogue_is_an_error() {
		let pool = create_migrated_test_pool().await;
		sqlx::query("DELETE FROM plans").execute(&pool).await.unwrap();

		let err = PlanRepository::new(pool).load_catalogue().await.unwrap_err();
		assert!(matches!(err, DbError::Internal(_)));
	}
}
