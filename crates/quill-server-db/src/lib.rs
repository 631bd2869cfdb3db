// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Quill.
//!
//! Repositories implement the store traits from `quill-server-auth`, so the
//! gate can run against this crate or against in-memory fakes. Rows are
//! soft-deleted through `deleted_at` and every read ignores them.

pub mod content;
pub mod error;
pub mod plan;
pub mod pool;
pub mod subscription;
pub mod team;
pub mod types;
pub mod usage;
pub mod user;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use content::ContentRepository;
pub use error::{DbError, Result};
pub use plan::PlanRepository;
pub use pool::{create_pool, run_migrations};
pub use subscription::{NewSubscription, SubscriptionRepository};
pub use team::TeamRepository;
pub use types::{Attachment, Book, NewBook, Project, Task};
pub use usage::UsageRepository;
pub use user::UserRepository;
