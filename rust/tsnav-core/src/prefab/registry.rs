//! Lazily decoded prefab definitions keyed by token.
//!
//! The cache lock is held across the decode, so a token is decoded at most once
//! even under concurrent lookups. Failures are cached as well.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::source::FileSource;
use crate::token::TokenDisplay;

use super::{PrefabDefinition, PrefabDescriptor};

pub struct PrefabRegistry {
    descriptors: FxHashMap<u64, PrefabDescriptor>,
    cache: Mutex<FxHashMap<u64, Option<Arc<PrefabDefinition>>>>,
    decodes: AtomicUsize,
}

impl PrefabRegistry {
    pub fn new(descriptors: FxHashMap<u64, PrefabDescriptor>) -> Self {
        Self { descriptors, cache: Mutex::new(FxHashMap::default()), decodes: AtomicUsize::new(0) }
    }

    pub fn knows(&self, token: u64) -> bool { self.descriptors.contains_key(&token) }

    /// Returns the decoded definition, reading and decoding it on first use.
    /// `None` when the token is unknown or its file is missing or malformed.
    pub fn lookup(&self, token: u64, source: &dyn FileSource) -> Option<Arc<PrefabDefinition>> {
        let desc = self.descriptors.get(&token)?;
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hit) = cache.get(&token) {
            return hit.clone();
        }
        self.decodes.fetch_add(1, Ordering::Relaxed);
        let decoded = source
            .read_file(&desc.path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| PrefabDefinition::parse(token, &desc.path, &desc.category, &bytes).map_err(|e| e.to_string()));
        let entry = match decoded {
            Ok(def) => {
                debug!(token = %TokenDisplay(token), path = %desc.path, nodes = def.nodes.len(), curves = def.curves.len(), routes = def.routes.len(), "prefab decoded");
                Some(Arc::new(def))
            }
            Err(error) => {
                warn!(token = %TokenDisplay(token), path = %desc.path, %error, "prefab definition rejected");
                None
            }
        };
        cache.insert(token, entry.clone());
        entry
    }

    /// Registers a definition decoded elsewhere unless the token is already cached.
    pub fn seed(&self, def: Arc<PrefabDefinition>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.entry(def.token).or_insert(Some(def));
        }
    }

    /// Already decoded definition, without touching any source.
    pub fn cached(&self, token: u64) -> Option<Arc<PrefabDefinition>> {
        self.cache.lock().ok()?.get(&token).cloned().flatten()
    }

    /// Number of decode attempts made so far.
    pub fn decode_count(&self) -> usize { self.decodes.load(Ordering::Relaxed) }

    /// Decoded definitions, in no particular order.
    pub fn loaded(&self) -> Vec<Arc<PrefabDefinition>> {
        match self.cache.lock() {
            Ok(c) => c.values().flatten().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

