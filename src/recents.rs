//! Persistence of the recent-creations carousel

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// One remembered creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentCreation {
    /// Base file name shared by the PNG/HTML artifacts
    pub base_name: String,

    /// The prompt that produced it
    pub prompt: String,

    /// Whether it was an autonomous daydream
    pub daydream: bool,
}

/// Load the recents list; a missing file is an empty list
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or parsed
pub fn load(path: &Path) -> Result<Vec<RecentCreation>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Save the recents list, pretty-printed for hand inspection
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn save(path: &Path, recents: &[RecentCreation]) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(recents)?)?;
    Ok(())
}

/// Append a creation, dropping the oldest entries past the cap
pub fn push_capped(recents: &mut Vec<RecentCreation>, entry: RecentCreation, max: usize) {
    recents.push(entry);
    if recents.len() > max {
        let excess = recents.len() - max;
        recents.drain(..excess);
    }
}
