use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Ordering applied to a directory listing before entries are probed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    None,
    Name,
    Size,
    Modified,
    Created,
    Random,
}

impl SortMode {
    pub fn all() -> &'static [SortMode] {
        use SortMode::*;
        &[None, Name, Size, Modified, Created, Random]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::None => "none",
            SortMode::Name => "name",
            SortMode::Size => "size",
            SortMode::Modified => "modified",
            SortMode::Created => "created",
            SortMode::Random => "random",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(SortMode::None);
        }
        SortMode::all()
            .iter()
            .copied()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ModelError::InvalidSort(raw.to_string()))
    }
}
