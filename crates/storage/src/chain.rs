//! In-memory chain head.

use meridian_core::{ChainHandler, StateError, StateResult};
use meridian_types::{BlockBody, Header, H256};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Default)]
struct Head {
    header: Option<Header>,
    hash: Option<H256>,
    body: Option<BlockBody>,
}

/// Chain head for one chain. Starts at genesis with no head header.
pub struct BlockChain {
    genesis: Header,
    head: RwLock<Head>,
}

impl BlockChain {
    /// Create a chain sitting at `genesis`.
    pub fn new(genesis: Header) -> Self {
        Self {
            genesis,
            head: RwLock::new(Head::default()),
        }
    }

    /// Nonce of the head, 0 at genesis.
    pub fn head_nonce(&self) -> u64 {
        self.head.read().header.as_ref().map_or(0, Header::nonce)
    }
}

impl ChainHandler for BlockChain {
    fn genesis_header(&self) -> Option<Header> {
        Some(self.genesis.clone())
    }

    fn current_header(&self) -> Option<Header> {
        self.head.read().header.clone()
    }

    fn current_header_hash(&self) -> Option<H256> {
        self.head.read().hash
    }

    fn current_body(&self) -> Option<BlockBody> {
        self.head.read().body.clone()
    }

    fn set_current_header(&self, header: Option<Header>) -> StateResult<()> {
        if let Some(header) = &header {
            if header.kind() != self.genesis.kind() {
                return Err(StateError::InvalidHead(format!(
                    "{} header on a {} chain",
                    header.kind(),
                    self.genesis.kind()
                )));
            }
        }
        debug!(nonce = header.as_ref().map(Header::nonce), "chain head updated");
        self.head.write().header = header;
        Ok(())
    }

    fn set_current_header_hash(&self, hash: Option<H256>) {
        self.head.write().hash = hash;
    }

    fn set_current_body(&self, body: Option<BlockBody>) {
        self.head.write().body = body;
    }
}
