use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single overlay or orchestration step.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// Backing up the pre-install version of a target file failed. Any
    /// partially written backup for that file has already been removed.
    #[error("failed to back up {}", .path.display())]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to download {url}")]
    DownloadFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("{0}")]
    InvariantViolated(String),
    #[error("archive entry escapes the install target: {0}")]
    UnsafeEntryPath(String),
    #[error("failed to read archive {}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, OverlayError>;

pub(crate) trait IoResultExt<T> {
    fn io_context<F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn io_context<F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| OverlayError::Io {
            context: context(),
            source,
        })
    }
}
