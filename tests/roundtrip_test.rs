use packr::archive::{open_for_read, EntryCodec};
use packr::{PackOptions, PackrError};
use rand::{thread_rng, Rng};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

// ---------- helpers ----------
fn create_test_data(dir: &Path, num_files: usize, file_size: usize) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir.join("nested/deeper"))?;
    let mut paths = Vec::new();
    let mut rng = thread_rng();
    for i in 0..num_files {
        let sub = match i % 3 {
            0 => PathBuf::new(),
            1 => PathBuf::from("nested"),
            _ => PathBuf::from("nested/deeper"),
        };
        let file_path = dir.join(sub).join(format!("file_{}.bin", i));
        let mut file = File::create(&file_path)?;
        let mut buf = vec![0u8; file_size];
        // half random, half repetitive so DEFLATE has something to do
        rng.fill(&mut buf[..file_size / 2]);
        file.write_all(&buf)?;
        paths.push(file_path);
    }
    Ok(paths)
}

fn collect_tree(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = packr::fsx::list_files(root)
        .unwrap()
        .into_iter()
        .map(|p| (p.strip_prefix(root).unwrap().to_path_buf(), fs::read(&p).unwrap()))
        .collect();
    files.sort();
    files
}

fn assert_dirs_equal(dir1: &Path, dir2: &Path) {
    let a = collect_tree(dir1);
    let b = collect_tree(dir2);
    assert_eq!(a.len(), b.len(), "Different number of files");
    for ((pa, ca), (pb, cb)) in a.iter().zip(&b) {
        assert_eq!(pa, pb, "path mismatch");
        assert_eq!(ca, cb, "Content mismatch for {:?}", pa);
    }
}

#[test]
fn archive_unarchive_roundtrip() {
    let src = tempdir().unwrap();
    create_test_data(src.path(), 9, 2048).unwrap();
    let work = tempdir().unwrap();
    let container = work.path().join("test.packr");
    let out = work.path().join("out");

    let report = packr::archive(src.path(), &container).unwrap();
    assert_eq!(report.entries, 9);
    assert_eq!(report.original_bytes, report.stored_bytes);

    let restored = packr::unarchive(&container, &out).unwrap();
    assert_eq!(restored.restored, 9);
    assert!(restored.skipped.is_empty());
    assert_dirs_equal(src.path(), &out);
}

#[test]
fn compress_decompress_roundtrip() {
    let src = tempdir().unwrap();
    create_test_data(src.path(), 9, 4096).unwrap();
    let work = tempdir().unwrap();
    let container = work.path().join("test.packr");
    let out = work.path().join("out");

    let report = packr::compress(src.path(), &container).unwrap();
    assert_eq!(report.entries, 9);
    assert!(report.stored_bytes < report.original_bytes);

    packr::decompress(&container, &out).unwrap();
    assert_dirs_equal(src.path(), &out);
}

#[test]
fn decompress_handles_uncompressed_containers() {
    let src = tempdir().unwrap();
    create_test_data(src.path(), 4, 512).unwrap();
    let work = tempdir().unwrap();
    let container = work.path().join("raw.packr");

    packr::archive(src.path(), &container).unwrap();
    packr::decompress(&container, &work.path().join("out")).unwrap();
    assert_dirs_equal(src.path(), &work.path().join("out"));
}

#[test]
fn unarchive_skips_compressed_entries() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"hello hello hello").unwrap();
    let work = tempdir().unwrap();
    let container = work.path().join("c.packr");

    packr::compress(src.path(), &container).unwrap();
    let report = packr::unarchive(&container, &work.path().join("out")).unwrap();
    assert_eq!(report.restored, 0);
    assert_eq!(report.skipped.len(), 1);
    assert!(!work.path().join("out/a.txt").exists());
}

#[test]
fn concrete_two_file_scenario() {
    let src = tempdir().unwrap();
    fs::create_dir(src.path().join("sub")).unwrap();
    fs::write(src.path().join("a.txt"), b"hello").unwrap();
    fs::write(src.path().join("sub/b.bin"), [0u8; 3]).unwrap();

    let work = tempdir().unwrap();
    let container = work.path().join("scenario.packr");
    packr::compress(src.path(), &container).unwrap();

    let bytes = fs::read(&container).unwrap();
    assert_eq!(&bytes[16..20], &2u32.to_le_bytes(), "on-disk entry_count");

    let out = work.path().join("fresh");
    packr::decompress(&container, &out).unwrap();
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(out.join("sub/b.bin")).unwrap(), [0u8; 3]);
    assert_eq!(collect_tree(&out).len(), 2);
}

#[test]
fn zero_byte_file_roundtrips() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("empty"), b"").unwrap();
    let work = tempdir().unwrap();
    let container = work.path().join("z.packr");

    packr::compress(src.path(), &container).unwrap();
    let loaded = open_for_read(&container).unwrap();
    let entry = &loaded.entries()[0];
    assert_eq!(entry.original_size(), 0);
    assert_eq!(entry.codec(), EntryCodec::Deflate);

    let out = work.path().join("out");
    packr::decompress(&container, &out).unwrap();
    assert_eq!(fs::read(out.join("empty")).unwrap().len(), 0);
}

#[test]
fn skipped_files_are_not_counted() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("short.txt"), b"ok").unwrap();
    let long_name = "n".repeat(200);
    let long_dir = src.path().join(&long_name);
    fs::create_dir(&long_dir).unwrap();
    // alias "nnn.../mmm..." exceeds the 255-byte alias field
    fs::write(long_dir.join("m".repeat(100)), b"too long").unwrap();

    let work = tempdir().unwrap();
    let container = work.path().join("skip.packr");
    let report = packr::compress(src.path(), &container).unwrap();

    assert_eq!(report.entries, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(open_for_read(&container).unwrap().len(), 1);
    assert_eq!(&fs::read(&container).unwrap()[16..20], &1u32.to_le_bytes());
}

#[test]
fn existing_output_is_never_overwritten() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a"), b"a").unwrap();
    let work = tempdir().unwrap();
    let container = work.path().join("exists.packr");
    fs::write(&container, b"precious").unwrap();

    let err = packr::compress(src.path(), &container).unwrap_err();
    assert!(matches!(err, PackrError::AlreadyExists { .. }));
    assert_eq!(fs::read(&container).unwrap(), b"precious");
}

#[test]
fn every_level_roundtrips_a_tree() {
    let src = tempdir().unwrap();
    create_test_data(src.path(), 3, 1500).unwrap();
    for level in [0, 1, 6, 9] {
        let work = tempdir().unwrap();
        let container = work.path().join("lvl.packr");
        let options = PackOptions { level, threads: 1 };
        packr::compress_with(src.path(), &container, &options).unwrap();
        packr::decompress(&container, &work.path().join("out")).unwrap();
        assert_dirs_equal(src.path(), &work.path().join("out"));
    }
}

#[cfg(unix)]
#[test]
fn colon_and_backslash_names_roundtrip_unchanged() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a:"), b"colon").unwrap();
    fs::create_dir(src.path().join("x:")).unwrap();
    fs::write(src.path().join("x:/f.txt"), b"inside").unwrap();
    fs::write(src.path().join("a\\b.txt"), b"backslash").unwrap();
    fs::create_dir(src.path().join("a")).unwrap();
    fs::write(src.path().join("a/b.txt"), b"real subdir").unwrap();
    let work = tempdir().unwrap();

    let container = work.path().join("names.packr");
    packr::compress(src.path(), &container).unwrap();
    let out = work.path().join("seq");
    let report = packr::decompress(&container, &out).unwrap();
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(report.restored, 4);
    assert_eq!(collect_tree(&out), collect_tree(src.path()));
    assert!(!out.join("f.txt").exists());

    let out = work.path().join("par");
    packr::decompress_parallel(&container, &out, 3).unwrap();
    assert_eq!(collect_tree(&out), collect_tree(src.path()));
    assert_eq!(fs::read(out.join("a\\b.txt")).unwrap(), b"backslash");
    assert_eq!(fs::read(out.join("a/b.txt")).unwrap(), b"real subdir");
}
