//! Submission payload produced by [`crate::UploadSession::serialize`].

use crate::file_kind::FileKind;
use crate::session::{RemoteFile, RemoteId, SourceFile};

/// A staged file ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub source: SourceFile,
    pub kind: FileKind,
}

/// Primary designation in payload terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryRef {
    /// One of the kept stored files.
    Remote(RemoteId),
    /// Index into [`UploadPayload::new_files`].
    NewFile(usize),
}

/// Immutable snapshot of a session, handed to the submission layer.
///
/// `keep_remote_ids` and `removed_remote_ids` partition the hydrated remote
/// set; `new_files` is in staging order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPayload {
    pub keep_remote_ids: Vec<RemoteId>,
    /// The kept files themselves, for endpoints that want full objects.
    pub kept_remote: Vec<RemoteFile>,
    pub removed_remote_ids: Vec<RemoteId>,
    pub new_files: Vec<NewFile>,
    pub primary: Option<PrimaryRef>,
}

impl UploadPayload {
    pub fn is_empty(&self) -> bool {
        self.keep_remote_ids.is_empty() && self.new_files.is_empty()
    }

    /// Total bytes of the new files.
    pub fn upload_size(&self) -> u64 {
        self.new_files.iter().map(|f| f.source.size()).sum()
    }
}
