//! `LFUH` checkpoint files: magic, version byte, bincode [`UserHistoryData`].

use std::fs;
use std::io;
use std::path::Path;

use super::{
    BigramRecord, HistoryEntry, UnigramRecord, UserHistory, UserHistoryData, MAGIC, VERSION,
};

fn invalid(reason: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.to_string())
}

impl UnigramRecord {
    fn new(word: &str, entry: &HistoryEntry) -> Self {
        Self {
            word: word.to_string(),
            count: entry.count,
            last_used: entry.last_used,
            valid: entry.valid,
        }
    }
}

impl BigramRecord {
    fn new(prev: &str, next: &str, entry: &HistoryEntry) -> Self {
        Self {
            prev: prev.to_string(),
            next: next.to_string(),
            count: entry.count,
            last_used: entry.last_used,
            valid: entry.valid,
        }
    }
}

impl From<&UnigramRecord> for HistoryEntry {
    fn from(r: &UnigramRecord) -> Self {
        Self {
            count: r.count,
            last_used: r.last_used,
            valid: r.valid,
        }
    }
}

impl From<&BigramRecord> for HistoryEntry {
    fn from(r: &BigramRecord) -> Self {
        Self {
            count: r.count,
            last_used: r.last_used,
            valid: r.valid,
        }
    }
}

impl From<&UserHistory> for UserHistoryData {
    fn from(h: &UserHistory) -> Self {
        let mut unigrams: Vec<UnigramRecord> = h
            .unigrams
            .iter()
            .map(|(word, e)| UnigramRecord::new(word, e))
            .collect();
        unigrams.sort_by(|a, b| a.word.cmp(&b.word));
        let mut bigrams: Vec<BigramRecord> = h
            .bigrams
            .iter()
            .flat_map(|(prev, inner)| {
                inner
                    .iter()
                    .map(move |(next, e)| BigramRecord::new(prev, next, e))
            })
            .collect();
        bigrams.sort_by(|a, b| (&a.prev, &a.next).cmp(&(&b.prev, &b.next)));
        Self { unigrams, bigrams }
    }
}

impl From<UserHistoryData> for UserHistory {
    fn from(data: UserHistoryData) -> Self {
        let mut history = UserHistory::new();
        for r in &data.unigrams {
            history.unigrams.insert(r.word.clone(), r.into());
        }
        for r in &data.bigrams {
            history
                .bigrams
                .entry(r.prev.clone())
                .or_default()
                .insert(r.next.clone(), r.into());
        }
        history
    }
}

impl UserHistory {
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let body = bincode::serialize(&UserHistoryData::from(self)).map_err(io::Error::other)?;
        let mut buf = Vec::with_capacity(MAGIC.len() + 1 + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend(body);
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let body = match bytes {
            [m0, m1, m2, m3, version, body @ ..] if [*m0, *m1, *m2, *m3] == *MAGIC => {
                if *version != VERSION {
                    return Err(invalid("unsupported version"));
                }
                body
            }
            [_, _, _, _, _, ..] => return Err(invalid("bad magic")),
            _ => return Err(invalid("too short")),
        };
        let data: UserHistoryData = bincode::deserialize(body)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(data.into())
    }

    /// Write `<path>.tmp` and rename it over `path`.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)
    }

    /// A missing file is an empty history.
    pub fn open(path: &Path) -> io::Result<Self> {
        match fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }
}
