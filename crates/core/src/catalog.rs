//! In-memory registry of ingested files.
//!
//! The catalog lives for the lifetime of the process: it starts empty, is never
//! written to disk, and everything in it is lost on restart. The corpus index
//! may be durable while the catalog is not, so after a restart semantic
//! questions still find old segments but type-directed questions do not.
//!
//! Records are kept in insertion order so that [`FileCatalog::find_first_by_type`]
//! always resolves to the earliest upload of a category. Later uploads of the
//! same category stay reachable through [`FileCatalog::lookup`] only.
//!
//! The catalog has no interior locking. Callers that ingest concurrently must
//! serialise [`FileCatalog::register`] behind a single writer, as
//! [`crate::DocumentQa`] does with its `RwLock`.

use crate::models::{FileCategory, FileRecord};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const FILE_ID_LEN: usize = 8;

#[derive(Debug, Default)]
pub struct FileCatalog {
    records: Vec<FileRecord>,
    positions: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record under its `file_id`. An existing id is replaced in place.
    pub fn register(&mut self, record: FileRecord) {
        match self.positions.get(&record.file_id) {
            Some(&position) => self.records[position] = record,
            None => {
                self.positions
                    .insert(record.file_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn lookup(&self, file_id: &str) -> Option<&FileRecord> {
        self.positions
            .get(file_id)
            .and_then(|&position| self.records.get(position))
    }

    pub fn find_first_by_type(&self, category: FileCategory) -> Option<&FileRecord> {
        self.records
            .iter()
            .find(|record| category.matches(&record.file_type))
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.positions.contains_key(file_id)
    }

    fn is_taken(&self, file_id: &str) -> bool {
        self.contains(file_id) || self.reserved.contains(file_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }

    /// Hands out a short lowercase hex id never used before by this catalog.
    ///
    /// The id stays reserved even if the upload it was issued for never
    /// registers, so two in-flight uploads cannot receive the same id.
    pub fn reserve_file_id(&mut self) -> String {
        loop {
            let candidate = Uuid::new_v4().simple().to_string()[..FILE_ID_LEN].to_string();
            if !self.is_taken(&candidate) {
                self.reserved.insert(candidate.clone());
                return candidate;
            }
        }
    }
}
