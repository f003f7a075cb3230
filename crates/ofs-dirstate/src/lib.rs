//! Working copy status engine.
//!
//! Reconciles three sources of truth into one status code per path: the
//! overlay of files that differ from the base commit, the base commit itself,
//! and the user's pending `add`/`remove` intents (directives) that no commit
//! reflects yet.
//!
//! # Key Types
//!
//! - [`Dirstate`] -- The engine: `status`, `add_all`, `remove_all`, `on_snapshot_changed`
//! - [`Status`] / [`StatusCode`] -- Result of one status query
//! - [`Directive`] / [`DirectiveTable`] -- Pending intents and their guarded table
//! - [`AddRemoveError`] -- Per-path user error collected by batch operations
//!
//! # Collaborators
//!
//! The engine owns only the directive table. Everything else arrives through
//! a trait:
//!
//! - [`Mount`] -- overlay enumeration, on-disk lookup, base snapshot
//! - [`DirstatePersistence`] -- durable storage of the directive table
//! - [`IgnoreMatcher`] -- ignore rules, consulted while building a status

pub mod directive;
pub mod dirstate;
pub mod error;
pub mod matcher;
pub mod memory;
pub mod mount;
pub mod persistence;
pub mod status;

pub use directive::{AddRemoveError, Directive, DirectiveMap, DirectiveTable};
pub use dirstate::Dirstate;
pub use error::{DirstateError, DirstateResult};
pub use matcher::{GitignoreMatcher, IgnoreMatcher, NoIgnore};
pub use memory::InMemoryMount;
pub use mount::{DiskEntry, Mount};
pub use persistence::{DirstatePersistence, FileDirstatePersistence, InMemoryDirstatePersistence};
pub use status::{Status, StatusCode};
