//! BSA archive reader.
//!
//! Opening an archive parses the header, the folder record table, the
//! per-folder file record tables and (when present) the file-name block, in
//! that order, once. The result is immutable: extraction never touches
//! archive state, so `load` may be called concurrently from multiple
//! threads.

use std::fs::File;
use std::path::Path;

use log::debug;
use memmap2::Mmap;
use veles_common::BinaryReader;

use crate::extract;
use crate::fallback::FallbackTool;
use crate::header::{FileCategory, Header};
use crate::index::{ArchiveIndex, FileKey};
use crate::record::{decode_name, FileRecord, FolderRecord, RawFileRecord, RawFolderRecord};
use crate::{Error, Result};

/// Folder descriptor before its name and files are known.
struct FolderDesc {
    file_count: u32,
    offset: u64,
}

/// File descriptor before its name is known.
struct FileDesc {
    size: u32,
    offset: u32,
    compressed: bool,
}

/// An opened BSA archive.
///
/// The archive file is memory-mapped once at open time; every extraction
/// takes a fresh cursor over the map and allocates its own buffers.
pub struct Bsa {
    mmap: Mmap,
    /// Archive file name (no directory), used for diagnostics and
    /// repository-side archive selection.
    name: String,
    version: u32,
    archive_flags: u32,
    category: FileCategory,
    folders: Vec<FolderRecord>,
    index: ArchiveIndex,
    fallback: Option<FallbackTool>,
}

impl Bsa {
    /// Open and fully parse a BSA archive.
    ///
    /// Fails with [`Error::InvalidMagic`] for non-BSA input and with an I/O
    /// or truncation error for malformed tables; no partial archive is ever
    /// produced.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut reader = BinaryReader::new(&mmap);
        let header = Header::parse(&mut reader)?;

        debug!(
            "{name}: version {}, flags {:#x}, {} folders, {} files declared, category {}",
            header.version,
            header.archive_flags,
            header.folder_count,
            header.file_count,
            header.category()
        );

        let descs = parse_folder_descriptors(&mut reader, header.folder_count)?;
        let tables = parse_file_tables(&mut reader, &descs, header.default_compressed())?;
        let (folders, index) = if header.has_file_names() {
            resolve_names(&mut reader, descs, tables)?
        } else {
            // Without a name block there is nothing to key lookups on; the
            // folder metadata is still exposed.
            (assemble_unnamed(descs, tables), ArchiveIndex::default())
        };

        debug!("{name}: indexed {} paths", index.len());

        Ok(Self {
            mmap,
            name,
            version: header.version,
            archive_flags: header.archive_flags,
            category: header.category(),
            folders,
            index,
            fallback: None,
        })
    }

    /// Configure an external decompression tool to try when the in-process
    /// codec rejects a payload.
    pub fn with_fallback_tool(mut self, tool: FallbackTool) -> Self {
        self.fallback = Some(tool);
        self
    }

    /// Archive file name (no directory).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Archive format version.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Raw archive flag bits.
    #[inline]
    pub fn archive_flags(&self) -> u32 {
        self.archive_flags
    }

    /// Content category decoded from the header.
    #[inline]
    pub fn category(&self) -> FileCategory {
        self.category
    }

    /// Parsed folders in archive order.
    #[inline]
    pub fn folders(&self) -> &[FolderRecord] {
        &self.folders
    }

    /// All composite paths (`folder\file`, lowercased) in parse order.
    #[inline]
    pub fn paths(&self) -> &[String] {
        self.index.paths()
    }

    /// The path index built at open time.
    #[inline]
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Look up a composite path case-insensitively.
    pub fn find(&self, path: &str) -> Option<&FileRecord> {
        let key = self.index.lookup(path)?;
        Some(&self.folders[key.folder].files[key.file])
    }

    /// Load and decompress one file by composite path.
    ///
    /// Errors are scoped to this call; the archive stays valid for other
    /// paths afterwards.
    pub fn load(&self, path: &str) -> Result<Vec<u8>> {
        let record = self
            .find(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        extract::read_payload(&self.mmap, record, self.version, self.fallback.as_ref())
    }

    /// Load and decompress one file by an already-resolved record.
    pub fn load_record(&self, record: &FileRecord) -> Result<Vec<u8>> {
        extract::read_payload(&self.mmap, record, self.version, self.fallback.as_ref())
    }
}

impl std::fmt::Debug for Bsa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bsa")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("folders", &self.folders.len())
            .field("paths", &self.index.len())
            .finish()
    }
}

/// Read `folder_count` fixed 24-byte folder descriptors.
fn parse_folder_descriptors(
    reader: &mut BinaryReader<'_>,
    folder_count: u32,
) -> Result<Vec<FolderDesc>> {
    let mut descs = Vec::with_capacity(folder_count as usize);
    for _ in 0..folder_count {
        let raw: RawFolderRecord = reader.read_struct()?;
        descs.push(FolderDesc {
            file_count: raw.file_count,
            offset: raw.offset,
        });
    }
    Ok(descs)
}

/// Read, per folder, its length-prefixed name and fixed 16-byte file
/// descriptors.
///
/// Returns one `(name, files)` pair per folder, in archive order.
fn parse_file_tables(
    reader: &mut BinaryReader<'_>,
    descs: &[FolderDesc],
    default_compressed: bool,
) -> Result<Vec<(String, Vec<FileDesc>)>> {
    let mut tables = Vec::with_capacity(descs.len());
    for desc in descs {
        // The counted folder name bytes include a trailing NUL in archives
        // in the wild; the cursor advances by the full count either way.
        let name_bytes = reader.read_bstring_bytes()?;
        let trimmed = match name_bytes.split_last() {
            Some((0, rest)) => rest,
            _ => name_bytes,
        };
        let name = decode_name(trimmed);

        let mut files = Vec::with_capacity(desc.file_count as usize);
        for _ in 0..desc.file_count {
            let raw: RawFileRecord = reader.read_struct()?;
            let (size, compressed) = raw.unpack_size(default_compressed);
            files.push(FileDesc {
                size,
                offset: raw.offset,
                compressed,
            });
        }
        tables.push((name, files));
    }
    Ok(tables)
}

/// Consume the flat file-name block and build the finished records and
/// index.
///
/// The block holds one null-terminated string per file descriptor across
/// the whole archive, in folder-then-file order. Assignment is positional:
/// the n-th string names the n-th descriptor, so a count mismatch between
/// block and tables misassigns names. The integration tests assert the
/// correspondence on synthetic archives.
fn resolve_names(
    reader: &mut BinaryReader<'_>,
    descs: Vec<FolderDesc>,
    tables: Vec<(String, Vec<FileDesc>)>,
) -> Result<(Vec<FolderRecord>, ArchiveIndex)> {
    let mut index = ArchiveIndex::default();
    let mut folders = Vec::with_capacity(descs.len());

    for (folder_idx, (desc, (folder_name, files))) in
        descs.into_iter().zip(tables).enumerate()
    {
        let mut records = Vec::with_capacity(files.len());
        for (file_idx, file) in files.into_iter().enumerate() {
            let name = decode_name(reader.read_cstring_bytes()?);
            let composite = format!("{folder_name}\\{name}").to_lowercase();
            index.insert(
                composite,
                FileKey {
                    folder: folder_idx,
                    file: file_idx,
                },
            );
            records.push(FileRecord {
                name,
                size: file.size,
                offset: file.offset,
                compressed: file.compressed,
            });
        }
        folders.push(FolderRecord {
            name: folder_name,
            file_count: desc.file_count,
            offset: desc.offset,
            files: records,
        });
    }

    Ok((folders, index))
}

/// Build folder records for archives without a file-name block.
fn assemble_unnamed(
    descs: Vec<FolderDesc>,
    tables: Vec<(String, Vec<FileDesc>)>,
) -> Vec<FolderRecord> {
    descs
        .into_iter()
        .zip(tables)
        .map(|(desc, (name, files))| FolderRecord {
            name,
            file_count: desc.file_count,
            offset: desc.offset,
            files: files
                .into_iter()
                .map(|file| FileRecord {
                    name: String::new(),
                    size: file.size,
                    offset: file.offset,
                    compressed: file.compressed,
                })
                .collect(),
        })
        .collect()
}
