use crate::domain::ParticipantId;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Errors from block-list persistence
#[derive(Debug, thiserror::Error)]
pub enum BlockListError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Block store unavailable: {0}")]
    Unavailable(String),
}

/// Durable keyed storage for blocked ids
pub trait BlockStore: Send {
    fn load(&self) -> Result<HashSet<ParticipantId>, BlockListError>;
    fn save(&self, ids: &HashSet<ParticipantId>) -> Result<(), BlockListError>;
}

/// In-memory store; clones share the same set
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    ids: Arc<Mutex<HashSet<ParticipantId>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HashSet<ParticipantId> {
        self.ids
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn load(&self) -> Result<HashSet<ParticipantId>, BlockListError> {
        self.ids
            .lock()
            .map(|ids| ids.clone())
            .map_err(|e| BlockListError::Unavailable(e.to_string()))
    }

    fn save(&self, ids: &HashSet<ParticipantId>) -> Result<(), BlockListError> {
        let mut stored = self
            .ids
            .lock()
            .map_err(|e| BlockListError::Unavailable(e.to_string()))?;
        *stored = ids.clone();
        Ok(())
    }
}

/// JSON array of ids in a single file
#[derive(Debug, Clone)]
pub struct JsonFileBlockStore {
    path: PathBuf,
}

impl JsonFileBlockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BlockStore for JsonFileBlockStore {
    fn load(&self) -> Result<HashSet<ParticipantId>, BlockListError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, ids: &HashSet<ParticipantId>) -> Result<(), BlockListError> {
        let mut sorted: Vec<_> = ids.iter().copied().collect();
        sorted.sort();
        let json = serde_json::to_vec_pretty(&sorted)?;

        // Write-then-rename so a crash never leaves a truncated list
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Set of excluded peers that survives across sessions
pub struct BlockList {
    ids: HashSet<ParticipantId>,
    store: Box<dyn BlockStore>,
}

impl BlockList {
    /// Load the list from `store`
    pub fn load(store: impl BlockStore + 'static) -> Result<Self, BlockListError> {
        let ids = store.load()?;
        Ok(Self {
            ids,
            store: Box::new(store),
        })
    }

    /// Load the list, starting empty if the store cannot be read
    pub fn load_or_empty(store: impl BlockStore + 'static) -> Self {
        let ids = match store.load() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("⚠️ Could not load block list, starting empty: {}", e);
                HashSet::new()
            }
        };
        Self {
            ids,
            store: Box::new(store),
        }
    }

    /// Memory-only list (tests, demos)
    pub fn in_memory() -> Self {
        Self {
            ids: HashSet::new(),
            store: Box::new(MemoryBlockStore::new()),
        }
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.ids.contains(id)
    }

    /// Block `id`
    ///
    /// The id is blocked in memory even when persisting fails; the error only
    /// reports that the block may not survive a restart.
    pub fn insert(&mut self, id: ParticipantId) -> Result<bool, BlockListError> {
        if !self.ids.insert(id) {
            return Ok(false);
        }
        self.store.save(&self.ids)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticipantId> {
        self.ids.iter()
    }
}

impl std::fmt::Debug for BlockList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockList")
            .field("ids", &self.ids.len())
            .finish()
    }
}
