//! Archive header parsing and flag decoding.

use veles_common::BinaryReader;

use crate::{Error, Result};

/// BSA magic bytes `b"BSA\0"` as a little-endian u32.
pub const MAGIC: u32 = 0x0041_5342;

/// Archive version using zlib payload compression (Oblivion through Skyrim LE).
pub const VERSION_ZLIB: u32 = 104;

/// Archive version using framed LZ4 payload compression (Skyrim SE).
pub const VERSION_LZ4: u32 = 105;

/// Archive-wide flag bits stored in the header.
pub mod archive_flags {
    /// A block of null-terminated file names follows the file record tables.
    pub const HAS_FILE_NAMES: u32 = 0x2;
    /// Payloads are compressed unless a record's size bit 30 overrides it.
    pub const DEFAULT_COMPRESSED: u32 = 0x4;
}

/// Fixed-size archive header: nine little-endian u32 fields.
///
/// The magic is validated during [`Header::parse`] and not retained. The
/// folder record offset and the name-length totals are informational; the
/// parser walks the tables sequentially and never seeks by them.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// Archive format version (104 = zlib era, 105 = LZ4 era).
    pub version: u32,
    /// Declared offset of the folder record table (informational).
    pub folder_record_offset: u32,
    /// Archive-wide flag bits, see [`archive_flags`].
    pub archive_flags: u32,
    /// Number of folder records.
    pub folder_count: u32,
    /// Declared total file count (informational).
    pub file_count: u32,
    /// Declared total folder name length (informational).
    pub total_folder_name_length: u32,
    /// Declared total file name length (informational).
    pub total_file_name_length: u32,
    /// Content category bitmask, see [`FileCategory`].
    pub file_category_flags: u32,
}

impl Header {
    /// Size of the on-disk header in bytes.
    pub const SIZE: usize = 4 * 9;

    /// Parse the header from the start of an archive.
    ///
    /// Fails with [`Error::InvalidMagic`] if the magic does not match; no
    /// other field is validated here.
    pub fn parse(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic {
                expected: MAGIC,
                actual: magic,
            });
        }

        Ok(Self {
            version: reader.read_u32()?,
            folder_record_offset: reader.read_u32()?,
            archive_flags: reader.read_u32()?,
            folder_count: reader.read_u32()?,
            file_count: reader.read_u32()?,
            total_folder_name_length: reader.read_u32()?,
            total_file_name_length: reader.read_u32()?,
            file_category_flags: reader.read_u32()?,
        })
    }

    /// Whether a file-name block follows the file record tables.
    #[inline]
    pub const fn has_file_names(&self) -> bool {
        self.archive_flags & archive_flags::HAS_FILE_NAMES != 0
    }

    /// Whether payloads are compressed by default.
    #[inline]
    pub const fn default_compressed(&self) -> bool {
        self.archive_flags & archive_flags::DEFAULT_COMPRESSED != 0
    }

    /// Decode the content category from the category bitmask.
    #[inline]
    pub const fn category(&self) -> FileCategory {
        FileCategory::from_flags(self.file_category_flags)
    }
}

/// Content category of an archive, decoded from the header's 9-bit
/// category mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Meshes,
    Textures,
    Menus,
    Sounds,
    Voices,
    Shaders,
    Trees,
    Fonts,
    Miscellaneous,
}

impl FileCategory {
    /// Decode a category mask.
    ///
    /// Total over all inputs: the lowest set bit among bits 0..=8 selects the
    /// category (bit 0 = Meshes ... bit 8 = Miscellaneous); higher bits are
    /// ignored once a lower one matches, and a mask with none of the nine
    /// bits set decodes to `Miscellaneous`.
    pub const fn from_flags(mask: u32) -> Self {
        match (mask & 0x1FF).trailing_zeros() {
            0 => Self::Meshes,
            1 => Self::Textures,
            2 => Self::Menus,
            3 => Self::Sounds,
            4 => Self::Voices,
            5 => Self::Shaders,
            6 => Self::Trees,
            7 => Self::Fonts,
            _ => Self::Miscellaneous,
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Meshes => "meshes",
            Self::Textures => "textures",
            Self::Menus => "menus",
            Self::Sounds => "sounds",
            Self::Voices => "voices",
            Self::Shaders => "shaders",
            Self::Trees => "trees",
            Self::Fonts => "fonts",
            Self::Miscellaneous => "miscellaneous",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(fields: [u32; 9]) -> Vec<u8> {
        fields.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    #[test]
    fn test_parse_header() {
        let data = header_bytes([MAGIC, 105, 36, 0x7, 2, 5, 40, 80, 0x2]);
        let mut reader = BinaryReader::new(&data);
        let header = Header::parse(&mut reader).unwrap();

        assert_eq!(header.version, 105);
        assert_eq!(header.folder_count, 2);
        assert_eq!(header.file_count, 5);
        assert!(header.has_file_names());
        assert!(header.default_compressed());
        assert_eq!(header.category(), FileCategory::Textures);
        assert_eq!(reader.position(), Header::SIZE);
    }

    #[test]
    fn test_bad_magic() {
        let data = header_bytes([0x0041_5242, 104, 36, 0, 0, 0, 0, 0, 0]);
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(
            Header::parse(&mut reader),
            Err(Error::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let data = header_bytes([MAGIC, 104, 36, 0, 0, 0, 0, 0, 0]);
        let mut reader = BinaryReader::new(&data[..20]);

        assert!(Header::parse(&mut reader).is_err());
    }

    #[test]
    fn test_flag_bits() {
        let data = header_bytes([MAGIC, 104, 36, 0x1, 0, 0, 0, 0, 0]);
        let header = Header::parse(&mut BinaryReader::new(&data)).unwrap();

        assert!(!header.has_file_names());
        assert!(!header.default_compressed());
    }

    #[test]
    fn test_category_lowest_bit_wins() {
        assert_eq!(FileCategory::from_flags(0x1), FileCategory::Meshes);
        assert_eq!(FileCategory::from_flags(0x2), FileCategory::Textures);
        assert_eq!(FileCategory::from_flags(0x100), FileCategory::Miscellaneous);
        // Meshes + Textures: bit 0 wins.
        assert_eq!(FileCategory::from_flags(0x3), FileCategory::Meshes);
        // Sounds + Fonts: bit 3 wins.
        assert_eq!(FileCategory::from_flags(0x88), FileCategory::Sounds);
    }

    #[test]
    fn test_category_defaults_to_miscellaneous() {
        assert_eq!(FileCategory::from_flags(0), FileCategory::Miscellaneous);
        // Bits above the 9-bit mask are ignored entirely.
        assert_eq!(FileCategory::from_flags(0x400), FileCategory::Miscellaneous);
        assert_eq!(FileCategory::from_flags(0x401), FileCategory::Meshes);
    }
}
