//! Case-insensitive path index over an archive's file records.

use std::collections::HashMap;

/// Position of a file record inside [`crate::Bsa::folders`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileKey {
    /// Index into the archive's folder list.
    pub folder: usize,
    /// Index into that folder's file list.
    pub file: usize,
}

/// Immutable mapping from lowercased composite path (`folder\file`) to the
/// position of its file record.
///
/// Composite paths are not guaranteed unique in the wild; insertion is
/// last-write-wins, so a duplicate path resolves to the record parsed
/// later while keeping its original position in [`ArchiveIndex::paths`].
/// This mirrors the behavior games rely on and is deliberately not "fixed".
#[derive(Debug, Default)]
pub struct ArchiveIndex {
    order: Vec<String>,
    map: HashMap<String, FileKey>,
}

impl ArchiveIndex {
    /// Insert a composite path. `path` must already be lowercased.
    pub(crate) fn insert(&mut self, path: String, key: FileKey) {
        if self.map.insert(path.clone(), key).is_none() {
            self.order.push(path);
        }
    }

    /// All composite paths in parse order.
    pub fn paths(&self) -> &[String] {
        &self.order
    }

    /// Look up a path case-insensitively.
    pub fn lookup(&self, path: &str) -> Option<FileKey> {
        self.map.get(&path.to_lowercase()).copied()
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the index holds no paths.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(folder: usize, file: usize) -> FileKey {
        FileKey { folder, file }
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let mut index = ArchiveIndex::default();
        index.insert("meshes\\chair.nif".to_string(), key(0, 0));

        assert_eq!(index.lookup("meshes\\chair.nif"), Some(key(0, 0)));
        assert_eq!(index.lookup("MESHES\\Chair.NIF"), Some(key(0, 0)));
        assert_eq!(index.lookup("meshes\\table.nif"), None);
    }

    #[test]
    fn test_last_write_wins_keeps_order() {
        let mut index = ArchiveIndex::default();
        index.insert("a\\x.dds".to_string(), key(0, 0));
        index.insert("b\\y.dds".to_string(), key(1, 0));
        index.insert("a\\x.dds".to_string(), key(2, 5));

        assert_eq!(index.paths(), ["a\\x.dds", "b\\y.dds"]);
        assert_eq!(index.lookup("a\\x.dds"), Some(key(2, 5)));
        assert_eq!(index.len(), 2);
    }
}
