use ofs_types::ObjectId;

use crate::error::StoreResult;
use crate::object::StoredObject;

/// Content-addressed object store.
///
/// Implementations must satisfy these invariants:
/// - Objects are immutable once written; the same bytes always produce the
///   same id.
/// - Concurrent reads are always safe.
/// - The store never interprets object contents.
/// - I/O errors are propagated, never swallowed.
pub trait ObjectStore: Send + Sync {
    /// Read an object by id. `Ok(None)` means it does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its id. Writing an existing object is a
    /// no-op.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object, returning whether it existed. Garbage collection
    /// only: deleting a referenced object corrupts the store.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;
}
