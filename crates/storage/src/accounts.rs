//! In-memory account state adapter.

use meridian_core::{AccountsAdapter, StateError, StateResult};
use meridian_types::H256;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::trace;

/// Tracks which trie roots exist and which one is loaded.
pub struct InMemoryAccounts {
    roots: RwLock<HashSet<H256>>,
    current: RwLock<H256>,
}

impl InMemoryAccounts {
    /// Start with only `genesis_root` known and loaded.
    pub fn new(genesis_root: H256) -> Self {
        let mut roots = HashSet::new();
        roots.insert(genesis_root);
        Self {
            roots: RwLock::new(roots),
            current: RwLock::new(genesis_root),
        }
    }

    /// Make `root` available to [`AccountsAdapter::recreate_trie`].
    pub fn add_root(&self, root: H256) {
        self.roots.write().insert(root);
    }

    /// Commit `root` and load it.
    pub fn commit(&self, root: H256) {
        self.add_root(root);
        *self.current.write() = root;
    }
}

impl AccountsAdapter for InMemoryAccounts {
    fn recreate_trie(&self, root: &H256) -> StateResult<()> {
        if !self.roots.read().contains(root) {
            return Err(StateError::UnknownRoot(*root));
        }
        trace!(root = %root.short(), "trie recreated");
        *self.current.write() = *root;
        Ok(())
    }

    fn root_hash(&self) -> H256 {
        *self.current.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recreate_unknown_root_fails() {
        let accounts = InMemoryAccounts::new(H256::NIL);
        let root = H256::new([5u8; 32]);
        assert!(accounts.recreate_trie(&root).is_err());
        assert_eq!(accounts.root_hash(), H256::NIL);

        accounts.add_root(root);
        accounts.recreate_trie(&root).unwrap();
        assert_eq!(accounts.root_hash(), root);
    }
}
