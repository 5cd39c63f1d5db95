//! Dictionary file header: a string-keyed attribute map in front of the body.
//!
//! Layout: `"LFDX"` magic, format byte, little-endian `u32` header length,
//! then the bincode-encoded attribute map.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::DictError;
use crate::locale::Locale;

pub(crate) const MAGIC: &[u8; 4] = b"LFDX";
pub(crate) const FORMAT: u8 = 1;
/// magic + format + header length
pub(crate) const PREAMBLE_SIZE: usize = 4 + 1 + 4;

pub const VERSION_KEY: &str = "version";
pub const LOCALE_KEY: &str = "locale";
pub const DICTIONARY_KEY: &str = "dictionary";
pub const DESCRIPTION_KEY: &str = "description";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionaryHeader {
    attributes: BTreeMap<String, String>,
}

impl DictionaryHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// The integer `version` attribute.
    pub fn version(&self) -> Result<u32, DictError> {
        let raw = self
            .get(VERSION_KEY)
            .ok_or_else(|| DictError::Parse("missing version attribute".to_string()))?;
        raw.trim()
            .parse()
            .map_err(|_| DictError::Parse(format!("version is not an integer: {raw:?}")))
    }

    pub fn locale(&self) -> Option<Locale> {
        self.get(LOCALE_KEY).map(Locale::parse)
    }

    /// Encode magic, format byte, length and attribute map.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, DictError> {
        let body = bincode::serialize(&self.attributes).map_err(DictError::Serialize)?;
        let len: u32 = body
            .len()
            .try_into()
            .map_err(|_| DictError::Parse("header exceeds u32::MAX".to_string()))?;
        let mut buf = Vec::with_capacity(PREAMBLE_SIZE + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(FORMAT);
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Parse the header at the start of `data`. Returns the header and the
    /// offset at which the body starts.
    pub(crate) fn parse(data: &[u8]) -> Result<(Self, usize), DictError> {
        let header_len = check_preamble(data)?;
        let end = PREAMBLE_SIZE + header_len;
        if data.len() < end {
            return Err(DictError::InvalidHeader);
        }
        let attributes: BTreeMap<String, String> =
            bincode::deserialize(&data[PREAMBLE_SIZE..end]).map_err(DictError::Deserialize)?;
        Ok((Self { attributes }, end))
    }

    /// Read only the header of the dictionary stored at `offset..offset + length`
    /// in `path`, without touching the body.
    pub fn read(path: &Path, offset: u64, length: u64) -> Result<Self, DictError> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut preamble = [0u8; PREAMBLE_SIZE];
        file.read_exact(&mut preamble)?;
        let header_len = check_preamble(&preamble)?;
        if (PREAMBLE_SIZE + header_len) as u64 > length {
            return Err(DictError::InvalidHeader);
        }
        let mut buf = vec![0u8; header_len];
        file.read_exact(&mut buf)?;
        let attributes: BTreeMap<String, String> =
            bincode::deserialize(&buf).map_err(DictError::Deserialize)?;
        Ok(Self { attributes })
    }

    /// Read the header of a standalone dictionary file.
    pub fn read_file(path: &Path) -> Result<Self, DictError> {
        let length = std::fs::metadata(path)?.len();
        Self::read(path, 0, length)
    }
}

fn check_preamble(data: &[u8]) -> Result<usize, DictError> {
    if data.len() < PREAMBLE_SIZE {
        return Err(DictError::InvalidHeader);
    }
    if &data[..4] != MAGIC {
        return Err(DictError::InvalidMagic);
    }
    if data[4] != FORMAT {
        return Err(DictError::UnsupportedFormat(data[4]));
    }
    let len = u32::from_le_bytes([data[5], data[6], data[7], data[8]]);
    Ok(len as usize)
}
