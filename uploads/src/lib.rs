//! Upload sessions for entity add/edit screens.
//!
//! An [`UploadSession`] tracks the files an entity already has on the server
//! next to the files a user just picked, exposes them as one ordered preview
//! list, and snapshots the result into an [`UploadPayload`] for submission.
//!
//! Everything here is synchronous and in-memory. Encoding the payload and
//! talking to the API belongs to the caller.

mod error;
mod file_kind;
mod gallery;
mod payload;
mod policy;
mod preview;
mod session;

pub use error::{ErrorKind, RejectReason, Rejection, UploadError};
pub use file_kind::{
    AcceptSet, FileKind, MIME_DOC, MIME_DOCX, MIME_GIF, MIME_JPEG, MIME_PDF, MIME_PNG, MIME_WEBP,
};
pub use gallery::{Gallery, GalleryEntry, GalleryFilter, next_index, previous_index};
pub use payload::{NewFile, PrimaryRef, UploadPayload};
pub use policy::{IMAGE_MAX_BYTES, InvalidMemberPolicy, StagingPolicy};
pub use preview::{ObjectUrlStore, PreviewStore, PreviewUrl};
pub use session::{
    EntryRef, PreviewEntry, RemoteFile, RemoteId, SourceFile, StageOutcome, StagedFile, StagedKey,
    UploadSession,
};
