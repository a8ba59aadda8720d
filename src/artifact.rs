//! Artifacts
//!
//! Generated or fetched models handed back to the caller, and the
//! client-side naming rule `{timestamp}_{username}_{hash}.glb`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::protocol::PLACEHOLDER_NAME;

/// Extension given to every synthesized filename
pub const ARTIFACT_EXTENSION: &str = ".glb";

/// Substituted when the server offers no usable name
pub const FALLBACK_NAME: &str = "unknown_hash";

/// Source of the timestamp embedded in filenames
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

/// Build `{timestamp}_{username}_{name}.glb`
///
/// An empty or placeholder `suggested` name becomes [`FALLBACK_NAME`]; a
/// trailing `.glb` (any case) is stripped before the extension is added.
/// Path separators in the name or username become `_`, so the result is
/// always a single path component.
pub fn synthesize_filename(suggested: Option<&str>, username: &str, timestamp_ms: u64) -> String {
    let mut name = match suggested {
        Some(name) if !name.is_empty() && name != PLACEHOLDER_NAME => name,
        _ => FALLBACK_NAME,
    };

    let ext_len = ARTIFACT_EXTENSION.len();
    if name.len() >= ext_len
        && name.is_char_boundary(name.len() - ext_len)
        && name[name.len() - ext_len..].eq_ignore_ascii_case(ARTIFACT_EXTENSION)
    {
        name = &name[..name.len() - ext_len];
    }

    format!(
        "{}_{}_{}{}",
        timestamp_ms,
        flatten_separators(username),
        flatten_separators(name),
        ARTIFACT_EXTENSION
    )
}

fn flatten_separators(part: &str) -> String {
    part.replace(|c: char| c == '/' || c == '\\', "_")
}

/// Model bytes plus the name they should be stored under
///
/// Owned by the caller once returned; nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub data: Vec<u8>,
    pub filename: String,
}

impl ArtifactHandle {
    pub fn new(data: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            data,
            filename: filename.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the artifact into `dir` under its filename
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        fs::write(&path, &self.data)?;
        tracing::debug!("Saved {} bytes to {}", self.data.len(), path.display());
        Ok(path)
    }
}
