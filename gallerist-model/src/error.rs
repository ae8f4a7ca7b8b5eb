use std::fmt::{self, Display};

/// Errors produced while decoding wire values into model types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidFilter(String),
    InvalidSort(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidFilter(raw) => {
                write!(f, "invalid filter: {raw}")
            }
            ModelError::InvalidSort(raw) => write!(f, "invalid sort: {raw}"),
        }
    }
}

impl std::error::Error for ModelError {}

