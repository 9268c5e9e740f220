//! Staging rules chosen per hosting screen.

use crate::error::{RejectReason, Rejection};
use crate::file_kind::{AcceptSet, FileKind};
use crate::session::SourceFile;

/// Size ceiling of the image gallery flows (5 MB).
pub const IMAGE_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// What happens to the valid members of a batch that also holds invalid ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidMemberPolicy {
    /// Stage the valid members, report the others.
    #[default]
    DropInvalid,
    /// Refuse the whole selection if any member is invalid.
    RejectBatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPolicy {
    pub accept: AcceptSet,
    pub accept_webp: bool,
    pub max_bytes: Option<u64>,
    pub on_invalid_member: InvalidMemberPolicy,
}

impl Default for StagingPolicy {
    fn default() -> Self {
        Self::documents()
    }
}

impl StagingPolicy {
    /// Image-only screens (news, activities): `WebP` allowed, 5 MB ceiling,
    /// one bad file refuses the selection.
    pub fn image_gallery() -> Self {
        Self {
            accept: AcceptSet::Images,
            accept_webp: true,
            max_bytes: Some(IMAGE_MAX_BYTES),
            on_invalid_member: InvalidMemberPolicy::RejectBatch,
        }
    }

    /// Mixed-file screens (documents, procedures, reforms): no size ceiling,
    /// invalid files are filtered out silently.
    pub fn documents() -> Self {
        Self {
            accept: AcceptSet::Mixed,
            accept_webp: false,
            max_bytes: None,
            on_invalid_member: InvalidMemberPolicy::DropInvalid,
        }
    }

    pub fn with_invalid_member(mut self, on_invalid_member: InvalidMemberPolicy) -> Self {
        self.on_invalid_member = on_invalid_member;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Checks one file against the policy.
    pub fn check(&self, file: &SourceFile) -> Result<FileKind, Rejection> {
        let Some(kind) = self.accept.classify(file.mime_type(), self.accept_webp) else {
            return Err(Rejection {
                name: file.name().to_owned(),
                reason: RejectReason::UnsupportedType {
                    mime_type: file.mime_type().to_owned(),
                },
            });
        };

        if let Some(limit) = self.max_bytes {
            let size = file.size();
            if size > limit {
                return Err(Rejection {
                    name: file.name().to_owned(),
                    reason: RejectReason::TooLarge { size, limit },
                });
            }
        }

        Ok(kind)
    }
}
