//! GitLab group membership reconciliation.
//!
//! This crate provides:
//! - The closed set of membership roles and their GitLab access levels
//! - The desired membership table that reconciliation converges toward
//! - The [`MembershipService`] trait and its GitLab REST implementation
//! - The [`Reconciler`] that diffs and applies membership changes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────────┐
//! │  DesiredMembership   │────▶│        Reconciler        │
//! │  (username -> Role)  │     │  plan_group + apply      │
//! └──────────────────────┘     └────────────┬─────────────┘
//!                                           │
//!                                           ▼
//! ┌──────────────────────┐     ┌──────────────────────────┐
//! │  ConnectionSource    │────▶│    MembershipService     │
//! │  (explicit / file)   │     │  GitLabClient | Mock     │
//! └──────────────────────┘     └──────────────────────────┘
//! ```

mod desired;
mod error;
mod role;

pub mod credentials;
pub mod gitlab;
pub mod reconciler;
pub mod service;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use credentials::{ConnectionSettings, ConnectionSource, GitLabSection, PrivateToken};
pub use desired::DesiredMembership;
pub use error::{Error, Result};
pub use gitlab::GitLabClient;
pub use reconciler::{
    GroupPlan, MembershipAction, ReconcileEvent, ReconcileReport, Reconciler, plan_group,
};
pub use role::{AccessLevel, Role};
pub use service::{Group, Member, MembershipService, User, resolve_user};
