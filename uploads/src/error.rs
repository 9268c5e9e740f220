use thiserror::Error;

use crate::session::{EntryRef, RemoteId, StagedKey};

/// Why a single file of a staging batch was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The declared MIME type is not in the accepted set.
    UnsupportedType { mime_type: String },
    /// The file exceeds the configured size ceiling.
    TooLarge { size: u64, limit: u64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedType { mime_type } if mime_type.is_empty() => {
                write!(f, "unknown file type")
            }
            Self::UnsupportedType { mime_type } => {
                write!(f, "unsupported file type {mime_type}")
            }
            Self::TooLarge { size, limit } => {
                write!(f, "{size} bytes exceeds the {limit} byte limit")
            }
        }
    }
}

/// A file refused during staging, reported back to the hosting screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectReason,
}

impl Rejection {
    pub fn is_size(&self) -> bool {
        matches!(self.reason, RejectReason::TooLarge { .. })
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

/// Coarse error category, for callers that branch on user-correctable
/// versus programmer-misuse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFileType,
    FileTooLarge,
    NotFound,
    DoubleRelease,
    DuplicateRemote,
    Disposed,
}

impl ErrorKind {
    /// Whether the user can fix this by choosing different files.
    pub fn is_user_correctable(self) -> bool {
        matches!(self, Self::UnsupportedFileType | Self::FileTooLarge)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("unsupported file type: {}", join(rejected))]
    UnsupportedFileType { rejected: Vec<Rejection> },
    #[error("file too large (limit {limit} bytes): {}", join(rejected))]
    FileTooLarge { rejected: Vec<Rejection>, limit: u64 },
    #[error("entry not found: {entry}")]
    NotFound { entry: EntryRef },
    #[error("staged entry {key} was already released")]
    DoubleRelease { key: StagedKey },
    #[error("remote file {id} appears more than once")]
    DuplicateRemote { id: RemoteId },
    #[error("upload session already disposed")]
    Disposed,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFileType { .. } => ErrorKind::UnsupportedFileType,
            Self::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DoubleRelease { .. } => ErrorKind::DoubleRelease,
            Self::DuplicateRemote { .. } => ErrorKind::DuplicateRemote,
            Self::Disposed => ErrorKind::Disposed,
        }
    }

    /// Files refused by a failed `stage` call. Empty for other errors.
    pub fn rejected(&self) -> &[Rejection] {
        match self {
            Self::UnsupportedFileType { rejected }
            | Self::FileTooLarge { rejected, .. } => rejected,
            _ => &[],
        }
    }

    /// Builds the batch error for a set of rejections.
    ///
    /// Size wins only when every rejection is size-based; a single type
    /// rejection makes the whole batch a type error.
    pub(crate) fn from_rejections(rejected: Vec<Rejection>) -> Self {
        let size_limit = rejected.iter().map(|r| match r.reason {
            RejectReason::TooLarge { limit, .. } => Some(limit),
            RejectReason::UnsupportedType { .. } => None,
        });

        match size_limit.collect::<Option<Vec<_>>>() {
            Some(limits) if !limits.is_empty() => Self::FileTooLarge {
                limit: limits[0],
                rejected,
            },
            _ => Self::UnsupportedFileType { rejected },
        }
    }
}

fn join(rejected: &[Rejection]) -> String {
    rejected
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
