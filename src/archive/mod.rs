//! # Container Format
//!
//! This module defines the in-memory model of a `.packr` container and its
//! fixed binary layout. Reading and writing the layout to disk lives in
//! [`reader`] and [`writer`].
//!
//! ```text
//! FileHeader   { version: [u8; 16], entry_count: u32 }                       20 bytes
//! entry_count times:
//!   EntryHeader { alias: [u8; 256], original_size: u32, stored_size: u32,
//!                 codec: u8 }                                               265 bytes
//!   payload     { stored_size bytes }
//! ```
//!
//! All integers are little-endian. Containers tagged [`LEGACY_VERSION`] use a
//! 264-byte entry header without the `codec` byte.

pub mod reader;
pub mod writer;

pub use reader::open_for_read;
pub use writer::{ContainerWriter, FinalizeSummary};

use serde::Serialize;

use crate::error::{PackrError, Result};

pub const VERSION_LEN: usize = 16;
pub const ALIAS_CAPACITY: usize = 256;
/// One byte of the alias field is kept for the NUL terminator.
pub const MAX_ALIAS_LEN: usize = ALIAS_CAPACITY - 1;

pub const FILE_HEADER_SIZE: usize = VERSION_LEN + 4;
pub const ENTRY_HEADER_SIZE: usize = ALIAS_CAPACITY + 4 + 4 + 1;
pub const LEGACY_ENTRY_HEADER_SIZE: usize = ALIAS_CAPACITY + 4 + 4;

/// Version tag written by this crate.
pub const CURRENT_VERSION: FormatVersion = FormatVersion(*b"packr-v2\0\0\0\0\0\0\0\0");
/// Version tag of containers without the per-entry codec byte.
pub const LEGACY_VERSION: FormatVersion = FormatVersion(*b"packr-v1\0\0\0\0\0\0\0\0");

/// The fixed-length identifier stored at the start of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatVersion(pub [u8; VERSION_LEN]);

impl FormatVersion {
    pub fn as_bytes(&self) -> &[u8; VERSION_LEN] {
        &self.0
    }

    /// Whether entries carry an explicit codec byte.
    pub fn has_codec_tag(&self) -> bool {
        *self != LEGACY_VERSION
    }

    pub fn entry_header_size(&self) -> usize {
        if self.has_codec_tag() {
            ENTRY_HEADER_SIZE
        } else {
            LEGACY_ENTRY_HEADER_SIZE
        }
    }

    pub(crate) fn from_bytes(bytes: [u8; VERSION_LEN]) -> Result<Self> {
        let version = FormatVersion(bytes);
        if version == CURRENT_VERSION || version == LEGACY_VERSION {
            Ok(version)
        } else {
            Err(PackrError::CorruptData(format!(
                "unknown container version {:?}",
                String::from_utf8_lossy(trim_nul(&bytes))
            )))
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(trim_nul(&self.0)))
    }
}

/// How an entry's payload was produced at pack time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCodec {
    /// Stored verbatim.
    Raw,
    /// Raw DEFLATE stream.
    Deflate,
}

impl EntryCodec {
    pub fn tag(self) -> u8 {
        match self {
            EntryCodec::Raw => 0,
            EntryCodec::Deflate => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(EntryCodec::Raw),
            1 => Ok(EntryCodec::Deflate),
            other => Err(PackrError::CorruptData(format!("unknown codec tag {other}"))),
        }
    }
}

/// The relative path of an entry, validated against the alias field capacity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alias(String);

impl Alias {
    pub fn new(alias: impl Into<String>) -> Result<Self> {
        let alias = alias.into();
        if alias.len() > MAX_ALIAS_LEN {
            return Err(PackrError::AliasTooLong { len: alias.len(), alias, max: MAX_ALIAS_LEN });
        }
        if alias.as_bytes().contains(&0) {
            return Err(PackrError::InvalidAlias { path: alias.into() });
        }
        Ok(Alias(alias))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn encode(&self) -> [u8; ALIAS_CAPACITY] {
        let mut field = [0u8; ALIAS_CAPACITY];
        field[..self.0.len()].copy_from_slice(self.0.as_bytes());
        field
    }

    fn decode(field: &[u8]) -> Result<Self> {
        let raw = trim_nul(field);
        let alias = std::str::from_utf8(raw)
            .map_err(|_| PackrError::CorruptData("entry alias is not valid UTF-8".into()))?;
        Ok(Alias(alias.to_owned()))
    }
}

impl std::fmt::Display for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One packed file: its alias, sizes and stored payload.
///
/// Entries are immutable once built; `stored_size` is always the payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    alias: Alias,
    codec: EntryCodec,
    original_size: u32,
    payload: Vec<u8>,
}

impl Entry {
    /// An entry whose payload is the file content itself.
    pub fn raw(alias: Alias, data: Vec<u8>) -> Result<Self> {
        let original_size = checked_size(&alias, data.len())?;
        Ok(Self { alias, codec: EntryCodec::Raw, original_size, payload: data })
    }

    /// An entry whose payload is a DEFLATE stream of `original_size` bytes.
    pub fn deflated(alias: Alias, original_size: u32, payload: Vec<u8>) -> Result<Self> {
        checked_size(&alias, payload.len())?;
        Ok(Self { alias, codec: EntryCodec::Deflate, original_size, payload })
    }

    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    pub fn codec(&self) -> EntryCodec {
        self.codec
    }

    pub fn original_size(&self) -> u32 {
        self.original_size
    }

    pub fn stored_size(&self) -> u32 {
        // Constructors reject payloads above u32::MAX.
        self.payload.len() as u32
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the original file bytes, inflating deflate entries.
    pub fn decode(&self) -> Result<Vec<u8>> {
        match self.codec {
            EntryCodec::Raw => Ok(self.payload.clone()),
            EntryCodec::Deflate => crate::codec::decompress(&self.payload, self.original_size as usize),
        }
    }

    pub fn info(&self) -> EntryInfo {
        EntryInfo {
            alias: self.alias.to_string(),
            codec: self.codec,
            original_size: self.original_size,
            stored_size: self.stored_size(),
        }
    }

    pub(crate) fn encode_header(&self) -> [u8; ENTRY_HEADER_SIZE] {
        let mut header = [0u8; ENTRY_HEADER_SIZE];
        header[..ALIAS_CAPACITY].copy_from_slice(&self.alias.encode());
        header[ALIAS_CAPACITY..ALIAS_CAPACITY + 4].copy_from_slice(&self.original_size.to_le_bytes());
        header[ALIAS_CAPACITY + 4..ALIAS_CAPACITY + 8].copy_from_slice(&self.stored_size().to_le_bytes());
        header[ALIAS_CAPACITY + 8] = self.codec.tag();
        header
    }
}

fn checked_size(alias: &Alias, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| PackrError::FileTooLarge { path: alias.as_str().into(), size: len as u64 })
}

/// A decoded entry header, before its payload has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntryHeader {
    pub alias: Alias,
    pub original_size: u32,
    pub stored_size: u32,
    pub codec: EntryCodec,
}

impl EntryHeader {
    /// Parses an entry header laid out for `version`.
    pub(crate) fn decode(bytes: &[u8], version: FormatVersion) -> Result<Self> {
        let alias = Alias::decode(&bytes[..ALIAS_CAPACITY])?;
        let original_size = read_u32(&bytes[ALIAS_CAPACITY..]);
        let stored_size = read_u32(&bytes[ALIAS_CAPACITY + 4..]);
        let codec = if version.has_codec_tag() {
            EntryCodec::from_tag(bytes[ALIAS_CAPACITY + 8])?
        } else if original_size != stored_size {
            EntryCodec::Deflate
        } else {
            EntryCodec::Raw
        };

        if codec == EntryCodec::Raw && original_size != stored_size {
            return Err(PackrError::CorruptData(format!(
                "raw entry '{alias}' records {original_size} bytes but stores {stored_size}"
            )));
        }
        Ok(Self { alias, original_size, stored_size, codec })
    }

    pub(crate) fn into_entry(self, payload: Vec<u8>) -> Entry {
        Entry { alias: self.alias, codec: self.codec, original_size: self.original_size, payload }
    }
}

/// Encodes the fixed file header.
pub(crate) fn encode_file_header(version: FormatVersion, entry_count: u32) -> [u8; FILE_HEADER_SIZE] {
    let mut header = [0u8; FILE_HEADER_SIZE];
    header[..VERSION_LEN].copy_from_slice(version.as_bytes());
    header[VERSION_LEN..].copy_from_slice(&entry_count.to_le_bytes());
    header
}

/// Decodes the fixed file header into its version tag and entry count.
pub(crate) fn decode_file_header(bytes: &[u8; FILE_HEADER_SIZE]) -> Result<(FormatVersion, u32)> {
    let mut version = [0u8; VERSION_LEN];
    version.copy_from_slice(&bytes[..VERSION_LEN]);
    let version = FormatVersion::from_bytes(version)?;
    Ok((version, read_u32(&bytes[VERSION_LEN..])))
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

/// Summary of an entry for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub alias: String,
    pub codec: EntryCodec,
    pub original_size: u32,
    pub stored_size: u32,
}

/// The in-memory container: a version tag and an append-only list of entries.
#[derive(Debug, Clone)]
pub struct Container {
    version: FormatVersion,
    entries: Vec<Entry>,
}

impl Container {
    pub fn new(version: FormatVersion) -> Self {
        Self { version, entries: Vec::new() }
    }

    pub(crate) fn with_entries(version: FormatVersion, entries: Vec<Entry>) -> Self {
        Self { version, entries }
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Adds `entry` after every entry appended so far.
    pub fn append(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Entries in storage order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of original sizes over all entries.
    pub fn original_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.original_size() as u64).sum()
    }

    /// Sum of stored sizes over all entries.
    pub fn stored_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.stored_size() as u64).sum()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new(CURRENT_VERSION)
    }
}
