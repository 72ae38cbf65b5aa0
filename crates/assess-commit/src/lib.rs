//! Assessment Commit System
//!
//! Decides *when* assessment state is persisted.
//!
//! # Core Concepts
//!
//! - [`Debouncer`]: owned quiet-period timer with `schedule`/`cancel`/`flush`
//! - [`AutosaveState`]: `Idle → Dirty → Scheduled → Saving → Idle` with a checked transition table
//! - [`CommitStrategy`]: one interface, two policies
//!   - [`DebouncedCommit`]: coalesce bursts of edits into one save
//!   - [`ImmediateCommit`]: write at once (assignment changes)
//! - [`CommitRouter`]: picks the strategy for a [`MutationClass`]
//! - [`AutosaveController`]: owns the state machine and debouncer, drives a [`SnapshotStore`]
//!
//! The two policies are deliberately kept apart: assignments must reach other
//! viewers without waiting out the quiet period, while answer edits are
//! batched.
//!
//! # Example
//!
//! ```rust,ignore
//! use assess_commit::{AutosaveController, CommitRouter, MutationClass};
//!
//! let router = CommitRouter::new(Duration::from_secs(5));
//! let mut controller = AutosaveController::new(router.quiet_period());
//!
//! router.route(MutationClass::Response, &mut controller, Instant::now())?;
//! if controller.is_due(Instant::now()) {
//!     let mutations = controller.begin_save()?;
//!     let snapshot = build_snapshot(mutations);
//!     controller.finish_save(store.save(&snapshot).await)?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod controller;
mod debounce;
mod error;
mod state_machine;
mod store;
mod strategy;

pub use controller::{AutosaveController, CommitReceipt};
pub use debounce::Debouncer;
pub use error::{CollaboratorError, CommitError};
pub use state_machine::{allowed_transitions, validate_transition, AutosaveState};
pub use store::SnapshotStore;
pub use strategy::{
    CommitDecision, CommitPolicy, CommitRouter, CommitStrategy, DebouncedCommit, ImmediateCommit,
    MutationClass,
};

/// Quiet period before a debounced save fires
pub const DEFAULT_QUIET_PERIOD: std::time::Duration = std::time::Duration::from_secs(5);

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
