//! Persisted rotation state of a file sink

use crate::core::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current segment of a file sink: calendar day as `YYYYMMDD` and sequence
/// number within that day. `day == 0` means the sink has never rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Manifest {
    pub day: u32,
    pub seq: u32,
}

impl Manifest {
    pub const fn new(day: u32, seq: u32) -> Self {
        Self { day, seq }
    }

    /// Read a manifest; missing, unreadable or malformed files yield `None`
    pub fn load(path: &Path) -> Option<Self> {
        let content = fs::read(path).ok()?;
        match serde_json::from_slice(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Ignoring malformed manifest '{}': {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Persist durably: write a sibling temp file, sync it, rename it over
    /// `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let temp = temp_path(path);
        let wrap = |e: std::io::Error| LoggerError::manifest(path.display().to_string(), e.to_string());

        let json = serde_json::to_vec(self)?;
        let mut file = File::create(&temp).map_err(wrap)?;
        file.write_all(&json).map_err(wrap)?;
        file.sync_all().map_err(wrap)?;
        drop(file);
        fs::rename(&temp, path).map_err(wrap)
    }

    /// Segment that follows this one when rotating on `today`.
    ///
    /// A later day starts over at sequence 0; the same (or an earlier) day
    /// bumps the sequence so the pair never goes backwards.
    pub fn next(&self, today: u32) -> Self {
        if today > self.day {
            Self::new(today, 0)
        } else {
            Self::new(self.day, self.seq + 1)
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}
