//! Write-ahead log next to a user-history checkpoint.
//!
//! Every learned, forgotten or cleared word is appended as one frame. A
//! checkpoint rewrites `*.lfuh` from memory and empties `*.lfuh.wal`.
//!
//! Frame: `u32` LE payload length, `u32` LE crc32 of the payload, bincode
//! [`WalEntry`]. Replay stops at the first short or damaged frame; anything
//! after it is dropped at the next checkpoint.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::UserHistory;
use crate::settings::settings;

const FRAME_HEADER: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum WalEntry {
    Record {
        prev: Option<String>,
        word: String,
        is_valid: bool,
        count: u32,
        timestamp: u64,
    },
    Remove {
        word: String,
    },
    Clear,
}

impl WalEntry {
    fn apply(self, history: &mut UserHistory) {
        match self {
            WalEntry::Record {
                prev,
                word,
                is_valid,
                count,
                timestamp,
            } => history.record_at(prev.as_deref(), &word, is_valid, count, timestamp),
            WalEntry::Remove { word } => {
                history.remove(&word);
            }
            WalEntry::Clear => history.clear(),
        }
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn encode_frame(entry: &WalEntry) -> io::Result<Vec<u8>> {
    let payload = bincode::serialize(entry).map_err(io::Error::other)?;
    let length = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "WAL entry too large"))?;
    let mut frame = Vec::with_capacity(FRAME_HEADER + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode the intact prefix of a WAL file.
fn decode_frames(mut data: &[u8]) -> Vec<WalEntry> {
    let mut entries = Vec::new();
    while data.len() >= FRAME_HEADER {
        let length = le_u32(&data[..4]) as usize;
        let crc = le_u32(&data[4..8]);
        let Some(payload) = data[FRAME_HEADER..].get(..length) else {
            break;
        };
        if length == 0 || crc32fast::hash(payload) != crc {
            break;
        }
        let Ok(entry) = bincode::deserialize::<WalEntry>(payload) else {
            break;
        };
        entries.push(entry);
        data = &data[FRAME_HEADER + length..];
    }
    entries
}

pub struct HistoryWal {
    checkpoint_path: PathBuf,
    wal_path: PathBuf,
    /// Append handle, opened on first write.
    file: Option<File>,
    /// Frames written or replayed since the last checkpoint.
    entry_count: usize,
}

impl HistoryWal {
    pub fn new(checkpoint_path: &Path) -> Self {
        Self {
            checkpoint_path: checkpoint_path.to_path_buf(),
            wal_path: checkpoint_path.with_extension("lfuh.wal"),
            file: None,
            entry_count: 0,
        }
    }

    /// Apply every intact frame to `history`. Returns how many were applied.
    pub fn replay(&mut self, history: &mut UserHistory) -> io::Result<usize> {
        let data = match fs::read(&self.wal_path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        let entries = decode_frames(&data);
        self.entry_count = entries.len();
        for entry in entries {
            entry.apply(history);
        }
        Ok(self.entry_count)
    }

    pub(crate) fn append(&mut self, entry: &WalEntry) -> io::Result<()> {
        let frame = encode_frame(entry)?;
        if self.file.is_none() {
            if let Some(parent) = self.wal_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.wal_path)?;
            self.file = Some(file);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(&frame)?;
        }
        self.entry_count += 1;
        Ok(())
    }

    pub fn needs_compact(&self) -> bool {
        self.entry_count >= settings().history.wal_compact_threshold
    }

    /// Empty the log. Only call once a checkpoint holds every frame.
    pub fn truncate_wal(&mut self) -> io::Result<()> {
        self.file = None;
        File::create(&self.wal_path)?;
        self.entry_count = 0;
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }
}

/// Load the checkpoint at `checkpoint_path` and replay its log on top.
pub fn open_with_wal(checkpoint_path: &Path) -> io::Result<(UserHistory, HistoryWal)> {
    let mut history = UserHistory::open(checkpoint_path)?;
    let mut wal = HistoryWal::new(checkpoint_path);
    wal.replay(&mut history)?;
    Ok((history, wal))
}
