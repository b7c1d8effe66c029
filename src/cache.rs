use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::codegen::CompiledModule;

/// Compiled modules of unchanged sources, shared by every compile of one
/// process.
#[derive(Default)]
pub struct IncrementalCache {
    entries: Mutex<HashMap<String, CompiledModule>>,
}

impl IncrementalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(file_path: &str, source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(file_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, file_path: &str, source: &str) -> Option<CompiledModule> {
        let key = Self::compute_hash(file_path, source);
        let hit = self.entries.lock().get(&key).cloned();
        if hit.is_some() {
            tracing::trace!(file = file_path, "cache hit");
        }
        hit
    }

    pub fn set(&self, file_path: &str, source: &str, module: CompiledModule) {
        let key = Self::compute_hash(file_path, source);
        self.entries.lock().insert(key, module);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
