use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::{GenomeIndex, IndexError, METADATA_EXTENSION};

/// All genome indexes a server knows about, loaded once at startup and
/// immutable afterwards, so it can be shared read-only across workers.
#[derive(Debug, Default)]
pub struct IndexSet {
    by_assembly: HashMap<String, Arc<GenomeIndex>>,
}

impl IndexSet {
    /// Load every `<name>.cpg_idx.json` / `<name>.cpg_idx` pair in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, IndexError> {
        let mut by_assembly = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(name) = file_name.strip_suffix(METADATA_EXTENSION) else {
                continue;
            };
            let index = GenomeIndex::read(dir, name)?;
            by_assembly.insert(index.meta.assembly.clone(), Arc::new(index));
        }
        Ok(IndexSet { by_assembly })
    }

    pub fn insert(&mut self, index: GenomeIndex) {
        self.by_assembly
            .insert(index.meta.assembly.clone(), Arc::new(index));
    }

    pub fn get(&self, assembly: &str) -> Option<Arc<GenomeIndex>> {
        self.by_assembly.get(assembly).cloned()
    }

    pub fn get_by_hash(&self, index_hash: u64) -> Option<Arc<GenomeIndex>> {
        self.by_assembly
            .values()
            .find(|index| index.meta.index_hash == index_hash)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.by_assembly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_assembly.is_empty()
    }

    pub fn assemblies(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_assembly.keys().cloned().collect();
        names.sort();
        names
    }
}
