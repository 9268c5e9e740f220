//! Per-entity adapters: where an entity lives in the API and which form
//! fields carry its files.

use std::str::FromStr;

use campus_uploads::{ObjectUrlStore, PreviewStore, StagingPolicy, UploadSession};
use thiserror::Error;

/// Entities of the back-office that own attached files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Activity,
    News,
    Document,
    Procedure,
    Reform,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        Self::Activity,
        Self::News,
        Self::Document,
        Self::Procedure,
        Self::Reform,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::News => "news",
            Self::Document => "document",
            Self::Procedure => "procedure",
            Self::Reform => "reform",
        }
    }

    pub fn profile(self) -> EntityProfile {
        match self {
            Self::Activity => EntityProfile::gallery(self, "activities"),
            Self::News => EntityProfile::gallery(self, "news"),
            Self::Document => EntityProfile::attachments(self, "documents"),
            Self::Procedure => EntityProfile::attachments(self, "procedures"),
            Self::Reform => EntityProfile::attachments(self, "reforms"),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity `{0}` (expected one of: activity, news, document, procedure, reform)")]
pub struct ParseEntityKindError(String);

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.as_str() == lowered || kind.profile().collection == lowered
            })
            .ok_or_else(|| ParseEntityKindError(s.to_owned()))
    }
}

/// How kept stored files are described in the kept-files field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepEncoding {
    /// JSON array of ids.
    Ids,
    /// JSON array of `{id, url, type, order}` objects.
    Objects,
}

/// Everything a hosting screen needs to know about one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityProfile {
    pub kind: EntityKind,
    /// REST collection segment, e.g. `activities`.
    pub collection: &'static str,
    /// Key of the file list inside the entity record.
    pub files_key: &'static str,
    /// Form field listing the stored files to keep.
    pub keep_field: &'static str,
    /// Repeated form field carrying each new file.
    pub new_file_field: &'static str,
    pub keep_encoding: KeepEncoding,
    pub policy: StagingPolicy,
}

impl EntityProfile {
    fn gallery(kind: EntityKind, collection: &'static str) -> Self {
        Self {
            kind,
            collection,
            files_key: "images",
            keep_field: "existingImages",
            new_file_field: "images",
            keep_encoding: KeepEncoding::Ids,
            policy: StagingPolicy::image_gallery(),
        }
    }

    fn attachments(kind: EntityKind, collection: &'static str) -> Self {
        Self {
            kind,
            collection,
            files_key: "files",
            keep_field: "existingFiles",
            new_file_field: "file",
            keep_encoding: KeepEncoding::Objects,
            policy: StagingPolicy::documents(),
        }
    }

    pub fn collection_path(&self, api_url: &str) -> String {
        format!("{api_url}/{}", self.collection)
    }

    pub fn item_path(&self, api_url: &str, id: &str) -> String {
        format!("{api_url}/{}/{id}", self.collection)
    }

    /// Empty session for an "add" screen of this entity.
    pub fn new_session(&self) -> UploadSession {
        self.new_session_with(ObjectUrlStore::new())
    }

    pub fn new_session_with<S: PreviewStore>(&self, store: S) -> UploadSession<S> {
        UploadSession::new(self.policy.clone(), store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_uploads::InvalidMemberPolicy;

    #[test]
    fn test_gallery_entities_reject_whole_batch() {
        for kind in [EntityKind::Activity, EntityKind::News] {
            let profile = kind.profile();
            assert_eq!(profile.keep_field, "existingImages");
            assert_eq!(profile.new_file_field, "images");
            assert_eq!(
                profile.policy.on_invalid_member,
                InvalidMemberPolicy::RejectBatch
            );
        }
    }

    #[test]
    fn test_document_entities_drop_invalid() {
        for kind in [EntityKind::Document, EntityKind::Procedure, EntityKind::Reform] {
            let profile = kind.profile();
            assert_eq!(profile.keep_field, "existingFiles");
            assert_eq!(profile.new_file_field, "file");
            assert_eq!(profile.keep_encoding, KeepEncoding::Objects);
            assert_eq!(
                profile.policy.on_invalid_member,
                InvalidMemberPolicy::DropInvalid
            );
        }
    }

    #[test]
    fn test_parse_entity_kind() {
        assert_eq!("news".parse::<EntityKind>(), Ok(EntityKind::News));
        assert_eq!("Activities".parse::<EntityKind>(), Ok(EntityKind::Activity));
        assert_eq!(" reform ".parse::<EntityKind>(), Ok(EntityKind::Reform));
        assert!("tuition".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_paths() {
        let profile = EntityKind::Procedure.profile();
        assert_eq!(
            profile.item_path("http://x/api", "12"),
            "http://x/api/procedures/12"
        );
        assert_eq!(profile.collection_path("/api"), "/api/procedures");
    }

    #[test]
    fn test_new_session_uses_entity_policy() {
        let session = EntityKind::News.profile().new_session();
        assert_eq!(session.policy(), &StagingPolicy::image_gallery());
    }
}
