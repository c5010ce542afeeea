//! Multi-archive registry.
//!
//! A game installation spreads its assets over many archives, while game
//! data refers to bare resource paths. [`BsaRepository`] owns a set of
//! opened archives and resolves a path to the archive that carries it. It
//! is an explicitly constructed value with no process-wide state; share it
//! behind your own synchronization if needed (all query methods take
//! `&self` and archives are immutable, so `&BsaRepository` is `Sync`).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use walkdir::WalkDir;

use veles_bsa::{Bsa, Error, FileCategory, Result};

/// An ordered registry of opened archives with cross-archive path lookup.
///
/// Path resolution is last-write-wins across archives, matching archive
/// load order semantics: when two archives carry the same composite path,
/// the archive registered later wins.
#[derive(Debug, Default)]
pub struct BsaRepository {
    archives: Vec<Bsa>,
    /// Composite path -> index into `archives`.
    entries: HashMap<String, usize>,
}

impl BsaRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every `.bsa` file directly inside `dir`, in sorted name order.
    pub fn open_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        self.open_dir_filtered(dir, |_| true)
    }

    /// Open the `.bsa` files directly inside `dir` whose file name passes
    /// `filter`, in sorted name order.
    pub fn open_dir_filtered<P, F>(&mut self, dir: P, filter: F) -> Result<()>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> bool,
    {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_lowercase().ends_with(".bsa") && filter(&name) {
                paths.push(entry.into_path());
            }
        }

        for path in paths {
            match Bsa::open(&path) {
                Ok(archive) => self.insert(archive),
                // A bad archive does not abort the scan; mirrors how game
                // loaders skip unreadable archives.
                Err(e) => warn!("skipping {}: {e}", path.display()),
            }
        }
        Ok(())
    }

    /// Register an opened archive and claim its paths.
    pub fn insert(&mut self, archive: Bsa) {
        let idx = self.archives.len();
        for path in archive.paths() {
            self.entries.insert(path.clone(), idx);
        }
        debug!(
            "registered {} ({} paths, category {})",
            archive.name(),
            archive.paths().len(),
            archive.category()
        );
        self.archives.push(archive);
    }

    /// Number of registered archives.
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Whether no archives are registered.
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// All registered archives in registration order.
    pub fn archives(&self) -> impl Iterator<Item = &Bsa> {
        self.archives.iter()
    }

    /// Registered archives whose header declares the given category.
    pub fn archives_of(&self, category: FileCategory) -> impl Iterator<Item = &Bsa> {
        self.archives
            .iter()
            .filter(move |a| a.category() == category)
    }

    /// Find a registered archive by its file name.
    pub fn get(&self, name: &str) -> Option<&Bsa> {
        self.archives.iter().find(|a| a.name() == name)
    }

    /// The archive that carries `path`, if any.
    pub fn archive_for(&self, path: &str) -> Option<&Bsa> {
        self.entries
            .get(&path.to_lowercase())
            .map(|&idx| &self.archives[idx])
    }

    /// Load a file by composite path from whichever archive carries it.
    pub fn load(&self, path: &str) -> Result<Vec<u8>> {
        let archive = self
            .archive_for(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        archive.load(path)
    }

    /// Pick the archive whose file name matches the most of the given
    /// search terms (case-insensitive substring match). Ties resolve to the
    /// later-registered archive; `None` if the repository is empty or no
    /// term matches anything.
    pub fn archive_containing(&self, terms: &[&str]) -> Option<&Bsa> {
        let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        self.archives
            .iter()
            .map(|archive| {
                let name = archive.name().to_lowercase();
                let rating = terms.iter().filter(|t| name.contains(t.as_str())).count();
                (archive, rating)
            })
            .filter(|(_, rating)| *rating > 0)
            .max_by_key(|(_, rating)| *rating)
            .map(|(archive, _)| archive)
    }

    /// Extract a file and write it to `out`.
    pub fn save_to_disk<P: AsRef<Path>>(&self, path: &str, out: P) -> Result<()> {
        let bytes = self.load(path)?;
        fs::write(out, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_repository() {
        let repo = BsaRepository::new();
        assert!(repo.is_empty());
        assert!(repo.archive_for("meshes\\x.nif").is_none());
        assert!(matches!(
            repo.load("meshes\\x.nif"),
            Err(Error::NotFound(_))
        ));
        assert!(repo.archive_containing(&["Textures"]).is_none());
    }

    #[test]
    fn test_open_dir_ignores_non_bsa() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), "not an archive").unwrap();
        // Invalid .bsa files are skipped with a warning, not fatal.
        fs::write(dir.path().join("broken.bsa"), "garbage").unwrap();

        let mut repo = BsaRepository::new();
        repo.open_dir(dir.path()).unwrap();
        assert!(repo.is_empty());
    }

    #[test]
    fn test_open_missing_dir_is_io_error() {
        let mut repo = BsaRepository::new();
        assert!(matches!(
            repo.open_dir("/definitely/not/a/real/dir"),
            Err(Error::Io(_))
        ));
    }
}
