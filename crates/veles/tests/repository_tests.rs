//! Repository behavior over real (synthetic, uncompressed) archives.

use std::fs;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use veles::{BsaRepository, Error, FileCategory};

/// Write a minimal uncompressed v104 archive: one folder, stored payloads.
fn write_archive(path: &Path, folder: &str, files: &[(&str, &[u8])], category_flags: u32) {
    let folder_name_len = folder.len() + 1;
    let file_name_len: usize = files.iter().map(|(n, _)| n.len() + 1).sum();
    let payload_start = 36 + 24 + 1 + folder_name_len + 16 * files.len() + file_name_len;

    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(0x0041_5342).unwrap();
    out.write_u32::<LittleEndian>(104).unwrap();
    out.write_u32::<LittleEndian>(36).unwrap();
    out.write_u32::<LittleEndian>(0x3).unwrap(); // names present, not compressed
    out.write_u32::<LittleEndian>(1).unwrap();
    out.write_u32::<LittleEndian>(files.len() as u32).unwrap();
    out.write_u32::<LittleEndian>(folder_name_len as u32).unwrap();
    out.write_u32::<LittleEndian>(file_name_len as u32).unwrap();
    out.write_u32::<LittleEndian>(category_flags).unwrap();

    out.write_u64::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(files.len() as u32).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(60).unwrap();

    out.write_u8(folder_name_len as u8).unwrap();
    out.extend_from_slice(folder.as_bytes());
    out.write_u8(0).unwrap();

    let mut offset = payload_start;
    for (_, payload) in files {
        out.write_u64::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(offset as u32).unwrap();
        offset += payload.len();
    }

    for (name, _) in files {
        out.extend_from_slice(name.as_bytes());
        out.write_u8(0).unwrap();
    }

    assert_eq!(out.len(), payload_start);
    for (_, payload) in files {
        out.extend_from_slice(payload);
    }

    fs::write(path, out).unwrap();
}

#[test]
fn scan_load_and_select() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(
        &dir.path().join("Game - Meshes.bsa"),
        "meshes",
        &[("chair.nif", b"chair data")],
        0x1,
    );
    write_archive(
        &dir.path().join("Game - Textures.bsa"),
        "textures",
        &[("wood.dds", b"wood data")],
        0x2,
    );

    let mut repo = BsaRepository::new();
    repo.open_dir(dir.path()).unwrap();
    assert_eq!(repo.len(), 2);

    // Cross-archive path resolution.
    assert_eq!(repo.load("meshes\\chair.nif").unwrap(), b"chair data");
    assert_eq!(repo.load("TEXTURES\\WOOD.DDS").unwrap(), b"wood data");
    assert!(matches!(
        repo.load("sounds\\steps.wav"),
        Err(Error::NotFound(_))
    ));

    let owner = repo.archive_for("textures\\wood.dds").unwrap();
    assert_eq!(owner.name(), "Game - Textures.bsa");

    // Fuzzy archive selection by name terms.
    let picked = repo.archive_containing(&["game", "textures"]).unwrap();
    assert_eq!(picked.name(), "Game - Textures.bsa");

    // Category-filtered iteration.
    let meshes: Vec<_> = repo
        .archives_of(FileCategory::Meshes)
        .map(|a| a.name().to_string())
        .collect();
    assert_eq!(meshes, ["Game - Meshes.bsa"]);
}

#[test]
fn later_archive_wins_shared_path() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(
        &dir.path().join("A - Base.bsa"),
        "meshes",
        &[("shared.nif", b"base version")],
        0x1,
    );
    write_archive(
        &dir.path().join("B - Patch.bsa"),
        "meshes",
        &[("shared.nif", b"patched version")],
        0x1,
    );

    let mut repo = BsaRepository::new();
    // Sorted scan order: A before B, so the patch claims the path.
    repo.open_dir(dir.path()).unwrap();

    assert_eq!(
        repo.load("meshes\\shared.nif").unwrap(),
        b"patched version"
    );
    assert_eq!(
        repo.archive_for("meshes\\shared.nif").unwrap().name(),
        "B - Patch.bsa"
    );
}

#[test]
fn filtered_scan() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(
        &dir.path().join("Game - Meshes.bsa"),
        "meshes",
        &[("chair.nif", b"chair data")],
        0x1,
    );
    write_archive(
        &dir.path().join("Game - Textures.bsa"),
        "textures",
        &[("wood.dds", b"wood data")],
        0x2,
    );

    let mut repo = BsaRepository::new();
    repo.open_dir_filtered(dir.path(), |name| name.contains("Textures"))
        .unwrap();

    assert_eq!(repo.len(), 1);
    assert!(repo.archive_for("meshes\\chair.nif").is_none());
    assert_eq!(repo.load("textures\\wood.dds").unwrap(), b"wood data");
}

#[test]
fn save_to_disk_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(
        &dir.path().join("Game - Meshes.bsa"),
        "meshes",
        &[("chair.nif", b"chair data")],
        0x1,
    );

    let mut repo = BsaRepository::new();
    repo.open_dir(dir.path()).unwrap();

    let out = dir.path().join("chair.nif");
    repo.save_to_disk("meshes\\chair.nif", &out).unwrap();
    assert_eq!(fs::read(&out).unwrap(), b"chair data");
}
