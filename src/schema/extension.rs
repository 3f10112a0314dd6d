use crate::error::{SieveError, SieveResult};

/// Maps binary-local extension indices (first-link order, stable across
/// save/load of a single binary) to extension names.
#[derive(Debug, Clone, Default)]
pub struct ExtensionTable {
    names: Vec<String>,
}

impl ExtensionTable {
    pub fn from_names(names: Vec<String>) -> Self {
        ExtensionTable { names }
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn name_at(&self, index: u32) -> SieveResult<&str> {
        self.names
            .get(index as usize)
            .map(String::as_str)
            .ok_or(SieveError::UnknownExtension(index))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
