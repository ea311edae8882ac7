//! Identity → name resolution through the target's chunked name table.

use std::collections::HashMap;

use tracing::trace;

use crate::memory::MemoryReader;
use crate::memory::layout::POINTER_SIZE;
use crate::memory::layout::names::{CHUNK_SIZE, STRING_OFFSET, STRING_WINDOW};

/// Resolves and caches entity names.
///
/// The table is `chunks[id / CHUNK_SIZE][id % CHUNK_SIZE]`, each slot a
/// pointer to an entry whose string sits at `STRING_OFFSET`. Resolved names
/// are cached for the whole session; an identity never changes its name.
#[derive(Debug, Clone)]
pub struct NameResolver {
    table: u64,
    cache: HashMap<i32, String>,
}

impl NameResolver {
    /// `table` is the dereferenced name-table anchor.
    pub fn new(table: u64) -> Self {
        Self {
            table,
            cache: HashMap::new(),
        }
    }

    pub fn table(&self) -> u64 {
        self.table
    }

    /// Name for `identity`, or an empty string if it cannot be read yet.
    ///
    /// Empty results are not cached so a slot that is still being populated
    /// is retried on the next cycle.
    pub fn resolve(&mut self, reader: &MemoryReader, identity: i32) -> String {
        if let Some(name) = self.cache.get(&identity) {
            return name.clone();
        }

        let name = self.read_name(reader, identity);
        if name.is_empty() {
            trace!("Name for identity {} not readable", identity);
        } else {
            self.cache.insert(identity, name.clone());
        }
        name
    }

    fn read_name(&self, reader: &MemoryReader, identity: i32) -> String {
        if identity < 0 || self.table == 0 {
            return String::new();
        }

        let chunk_index = (identity / CHUNK_SIZE) as u64;
        let slot_index = (identity % CHUNK_SIZE) as u64;

        let chunk = reader.read_ptr(self.table.wrapping_add(chunk_index * POINTER_SIZE));
        if chunk == 0 {
            return String::new();
        }
        let entry = reader.read_ptr(chunk.wrapping_add(slot_index * POINTER_SIZE));
        if entry == 0 {
            return String::new();
        }
        reader.read_fixed_string(entry.wrapping_add(STRING_OFFSET), STRING_WINDOW)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
