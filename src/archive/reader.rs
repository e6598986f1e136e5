use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use tracing::{debug, info};

use super::{decode_file_header, Container, EntryHeader, FILE_HEADER_SIZE};
use crate::error::{PackrError, Result};

/// Opens an existing container and loads every entry into memory.
///
/// Either the whole container is returned or an error is; a truncated file
/// fails with [`PackrError::CorruptData`] instead of yielding a partial list.
pub fn open_for_read(path: impl AsRef<Path>) -> Result<Container> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PackrError::NotFound { path: path.to_path_buf() },
        _ => PackrError::io(e, path),
    })?;
    let container = read_container(BufReader::new(file)).map_err(|e| match e {
        PackrError::Io { source, .. } => PackrError::io(source, path),
        other => other,
    })?;
    info!(path = %path.display(), entries = container.len(), "container loaded");
    Ok(container)
}

/// Decodes a container from any byte source.
pub fn read_container<R: Read>(mut reader: R) -> Result<Container> {
    let mut header = [0u8; FILE_HEADER_SIZE];
    read_exact_or_corrupt(&mut reader, &mut header, "file header")?;
    let (version, entry_count) = decode_file_header(&header)?;
    debug!(%version, entry_count, "reading container");

    let header_size = version.entry_header_size();
    let mut header_buf = vec![0u8; header_size];
    // entry_count is untrusted until the entries are actually there
    let mut entries = Vec::with_capacity((entry_count as usize).min(4096));

    for index in 0..entry_count {
        read_exact_or_corrupt(&mut reader, &mut header_buf, "entry header")?;
        let entry_header = EntryHeader::decode(&header_buf, version)?;

        let expected = entry_header.stored_size as u64;
        let mut payload = Vec::new();
        (&mut reader)
            .take(expected)
            .read_to_end(&mut payload)
            .map_err(|e| PackrError::io(e, ""))?;
        if payload.len() as u64 != expected {
            return Err(PackrError::CorruptData(format!(
                "entry {index} ('{}') is truncated: {} of {expected} payload bytes present",
                entry_header.alias,
                payload.len()
            )));
        }
        entries.push(entry_header.into_entry(payload));
    }

    // entry_count must account for the whole file
    let mut extra = [0u8; 1];
    let trailing = loop {
        match reader.read(&mut extra) {
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PackrError::io(e, "")),
        }
    };
    if trailing != 0 {
        return Err(PackrError::CorruptData(format!(
            "trailing bytes after last entry; header declares {entry_count} entries"
        )));
    }

    Ok(Container::with_entries(version, entries))
}

fn read_exact_or_corrupt<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => PackrError::CorruptData(format!("short read of {what}")),
        _ => PackrError::io(e, ""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{encode_file_header, Alias, Entry, LEGACY_VERSION};

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_for_read(dir.path().join("nope.packr")).unwrap_err();
        assert!(matches!(err, PackrError::NotFound { .. }));
    }

    #[test]
    fn empty_input_is_corrupt() {
        let err = read_container(&[][..]).unwrap_err();
        assert!(matches!(err, PackrError::CorruptData(_)));
    }

    #[test]
    fn inflated_entry_count_is_corrupt() {
        let bytes = encode_file_header(crate::archive::CURRENT_VERSION, 1_000_000);
        assert!(matches!(read_container(&bytes[..]), Err(PackrError::CorruptData(_))));
    }

    fn two_entry_container() -> Vec<u8> {
        let mut bytes = encode_file_header(crate::archive::CURRENT_VERSION, 2).to_vec();
        for name in ["first", "second"] {
            let entry = Entry::raw(Alias::new(name).unwrap(), name.as_bytes().to_vec()).unwrap();
            bytes.extend_from_slice(&entry.encode_header());
            bytes.extend_from_slice(entry.payload());
        }
        bytes
    }

    #[test]
    fn understated_entry_count_is_corrupt() {
        let mut bytes = two_entry_container();
        assert_eq!(read_container(&bytes[..]).unwrap().len(), 2);

        bytes[16..20].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(read_container(&bytes[..]), Err(PackrError::CorruptData(_))));
    }

    #[test]
    fn trailing_bytes_are_corrupt() {
        let mut bytes = two_entry_container();
        bytes.push(0);
        assert!(matches!(read_container(&bytes[..]), Err(PackrError::CorruptData(_))));
    }

    #[test]
    fn reads_legacy_layout() {
        let text = b"legacy text legacy text legacy text".to_vec();
        let packed = crate::codec::compress(&text, 6).unwrap();

        let mut bytes = encode_file_header(LEGACY_VERSION, 2).to_vec();
        for (alias, original, payload) in [("plain.txt", 3u32, b"abc".to_vec()), ("packed.txt", text.len() as u32, packed)] {
            let mut header = [0u8; 264];
            header[..alias.len()].copy_from_slice(alias.as_bytes());
            header[256..260].copy_from_slice(&original.to_le_bytes());
            header[260..264].copy_from_slice(&(payload.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&header);
            bytes.extend_from_slice(&payload);
        }

        let container = read_container(&bytes[..]).unwrap();
        assert_eq!(container.version(), LEGACY_VERSION);
        assert_eq!(container.entries()[0].decode().unwrap(), b"abc");
        assert_eq!(container.entries()[1].decode().unwrap(), text);
    }

    #[test]
    fn preserves_storage_order() {
        let mut bytes = encode_file_header(crate::archive::CURRENT_VERSION, 3).to_vec();
        for name in ["z", "m", "a"] {
            let entry = Entry::raw(Alias::new(name).unwrap(), name.as_bytes().to_vec()).unwrap();
            bytes.extend_from_slice(&entry.encode_header());
            bytes.extend_from_slice(entry.payload());
        }
        let container = read_container(&bytes[..]).unwrap();
        let names: Vec<_> = container.entries().iter().map(|e| e.alias().as_str()).collect();
        assert_eq!(names, ["z", "m", "a"]);
    }
}
