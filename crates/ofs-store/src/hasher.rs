use ofs_types::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is hashed ahead of the data, so a blob and a tree with
/// identical bytes never share an id.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    pub const BLOB: Self = Self::new("ofs-blob-v1");
    pub const TREE: Self = Self::new("ofs-tree-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_separate_identical_bytes() {
        let data = b"same bytes";
        assert_ne!(ContentHasher::BLOB.hash(data), ContentHasher::TREE.hash(data));
        assert_ne!(ContentHasher::BLOB.hash(data), ObjectId::from_bytes(data));
    }

    #[test]
    fn verify_matches_hash() {
        let id = ContentHasher::BLOB.hash(b"x");
        assert!(ContentHasher::BLOB.verify(b"x", &id));
        assert!(!ContentHasher::BLOB.verify(b"y", &id));
    }
}
