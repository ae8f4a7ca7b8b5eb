use std::{net::IpAddr, path::PathBuf, time::Duration};

use thiserror::Error;

/// Failure to determine the kind or dimensions of a single entry.
///
/// Never fatal to a crawl: the entry is logged and dropped.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image header unreadable: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported media type: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("No representative media file under {}", .0.display())]
    NoRepresentative(PathBuf),

    #[error("Probe tool failed: {0}")]
    Tool(String),

    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("Dimensions undeterminable: {0}")]
    Undeterminable(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to enumerate {}: {source}", path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Port allocation failures. Only [`PortError::NoPortAvailable`] and a
/// strict [`PortError::Locked`] escape [`crate::net::PortAllocator::acquire`].
#[derive(Error, Debug)]
pub enum PortError {
    #[error("Port {0} is locked by a recent allocation")]
    Locked(u16),

    #[error("No available ports found")]
    NoPortAvailable,

    #[error("Failed to probe port {port} on {host}: {source}")]
    Io {
        port: u16,
        host: IpAddr,
        #[source]
        source: std::io::Error,
    },
}

impl PortError {
    /// Whether the OS rejected the port itself, so the next candidate
    /// should be tried.
    pub fn is_unavailable(&self) -> bool {
        match self {
            PortError::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::AddrInUse
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}
