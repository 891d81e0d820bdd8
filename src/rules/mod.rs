pub mod collision;
pub mod loader;
pub mod schema;

pub use collision::{find_collisions, Collision, CollisionKind};
pub use loader::{load_dir, load_from_path, load_from_str, RuleFileError};
pub use schema::{
    Rule, RuleEntry, RuleFile, RuleMeta, RuleRef, RuleSet, Tier, ValidationError,
    ValidationIssue,
};

use crate::target::FileType;
use std::collections::BTreeMap;

/// Rule sets keyed by the file type they translate.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    sets: BTreeMap<FileType, RuleSet>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, file_type: FileType, set: RuleSet) -> Self {
        self.insert(file_type, set);
        self
    }

    pub fn insert(&mut self, file_type: FileType, set: RuleSet) {
        self.sets.insert(file_type, set);
    }

    pub fn get(&self, file_type: FileType) -> Option<&RuleSet> {
        self.sets.get(&file_type)
    }

    pub fn contains(&self, file_type: FileType) -> bool {
        self.sets.contains_key(&file_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileType, &RuleSet)> {
        self.sets.iter().map(|(t, s)| (*t, s))
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
