//! Content-addressed object storage for the overlay working copy.
//!
//! Committed file contents live here as immutable blobs, and directory
//! listings as trees, each keyed by the BLAKE3 hash of its bytes
//! (domain-separated by object kind). The status engine never reads blob
//! bytes back: it compares [`ObjectId`]s, which is why a hash-keyed store is
//! enough to answer "does the working copy differ from the base commit?".
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content (or a symlink target)
//! - [`Tree`] -- one directory level, mapping names to object references
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- loose objects under a directory, one file each
//!
//! # Snapshots
//!
//! [`SnapshotTree`] flattens a root tree into a `path -> entry` map. It is
//! the "base snapshot" the status engine classifies against, and the value a
//! commit or checkout hands to the snapshot-transition pass.
//!
//! [`ObjectId`]: ofs_types::ObjectId

pub mod error;
pub mod fs;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use snapshot::{SnapshotEntry, SnapshotTree};
pub use traits::ObjectStore;
