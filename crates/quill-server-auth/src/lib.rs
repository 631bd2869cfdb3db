// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team-scoped authorization and plan entitlement gate for Quill.
//!
//! Per request the gate resolves which team the caller acts as, checks
//! membership, role and book-level access, and confirms the team holds a live
//! subscription. Handlers then ask the [`QuotaChecker`] whether the plan
//! admits one more of whatever they are about to create.
//!
//! The gate only reads. Stores are reached through the traits in [`store`],
//! implemented for SQLite by `quill-server-db`.

pub mod error;
pub mod gate;
pub mod middleware;
pub mod plan;
pub mod quota;
pub mod store;
pub mod subscription;
pub mod team;
pub mod token;
pub mod types;
pub mod user;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{DenyReason, GateError, Resource, StoreError};
pub use gate::{AccessResolver, GateOptions, ResolvedTeam, TeamContext, TeamGate};
pub use middleware::{extract_bearer_token, CurrentUser};
pub use plan::{Limit, Plan, PlanCatalogue, PlanCode, PlanLimits};
pub use quota::QuotaChecker;
pub use store::{Clock, SubscriptionStore, SystemClock, TeamStore, UsageStore};
pub use subscription::{
	ActivePlan, Subscription, SubscriptionFilter, SubscriptionOwner, SubscriptionResolver,
};
pub use team::{AccessScope, Team, TeamAccess, TeamClient, TeamMember};
pub use token::{generate_api_token, hash_token};
pub use types::{
	AccessMode, AttachmentId, BookId, PlanId, ProjectId, SubscriptionId, TaskId, TeamAccessId,
	TeamClientId, TeamId, TeamMemberId, TeamRoleName, UserId,
};
pub use user::User;
