//! Foundation types for the overlay working copy.
//!
//! Every other `ofs` crate depends on `ofs-types`. It holds the two value
//! kinds that flow through the whole system: content identifiers and
//! canonical paths.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`RelativePath`] -- Canonical path relative to the working copy root
//! - [`AbsolutePath`] -- Canonical path starting at the filesystem root
//!
//! # Path Canonicalization
//!
//! [`canonicalize`] and [`canonicalize_with_base`] reduce arbitrary path
//! strings to a single normal form without touching the filesystem.
//! [`resolve_real_path`] is the filesystem-consulting counterpart that also
//! resolves symlinks.

pub mod error;
pub mod object;
pub mod path;

pub use error::{PathError, TypeError};
pub use object::ObjectId;
pub use path::{
    basename, canonicalize, canonicalize_with_base, dirname, getcwd, resolve_real_path,
    AbsolutePath, RelativePath, SEPARATOR,
};
