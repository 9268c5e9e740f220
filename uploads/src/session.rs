//! Upload session: the set of files attached to one entity while it is
//! being added or edited.
//!
//! A session holds a single ordered list of entries. Remote entries (files
//! the server already stores) come first, in display order, and are never
//! reordered; staged entries (files picked locally) follow in staging order.
//! Removing a remote entry only marks it, so the kept and removed lists
//! always partition the hydrated set.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Rejection, UploadError};
use crate::file_kind::{FileKind, essence};
use crate::gallery::{Gallery, GalleryEntry, GalleryFilter};
use crate::payload::{NewFile, PrimaryRef, UploadPayload};
use crate::policy::{InvalidMemberPolicy, StagingPolicy};
use crate::preview::{ObjectUrlStore, PreviewStore, PreviewUrl};

/// A file chosen locally. The bytes are shared, so payload snapshots do
/// not copy them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let mime_type: String = mime_type.into();
        Self {
            name: name.into(),
            mime_type: essence(&mime_type),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared MIME type, lowercased and stripped of parameters.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Server-issued identifier of a stored file. Accepts JSON strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(id) => RemoteId(id),
            Raw::Number(id) => RemoteId(id.to_string()),
        })
    }
}

/// A file already persisted server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: RemoteId,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: FileKind,
    /// Display position. Missing positions default to hydration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl RemoteFile {
    pub fn new(id: impl Into<RemoteId>, url: impl Into<String>, kind: FileKind) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            kind,
            order: None,
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

/// Single-use token identifying one staged file within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StagedKey(u64);

impl std::fmt::Display for StagedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "staged#{}", self.0)
    }
}

/// A file staged locally but not yet uploaded.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub key: StagedKey,
    pub source: SourceFile,
    pub preview: PreviewUrl,
    pub kind: FileKind,
    pub staged_at: DateTime<Utc>,
}

impl StagedFile {
    /// Time since the file was staged, clamped at zero.
    pub fn held_for(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.staged_at).max(TimeDelta::zero())
    }
}

/// Reference to any entry of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryRef {
    Remote(RemoteId),
    Staged(StagedKey),
}

impl EntryRef {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<StagedKey> for EntryRef {
    fn from(key: StagedKey) -> Self {
        Self::Staged(key)
    }
}

impl From<RemoteId> for EntryRef {
    fn from(id: RemoteId) -> Self {
        Self::Remote(id)
    }
}

impl std::fmt::Display for EntryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(id) => write!(f, "remote {id}"),
            Self::Staged(key) => write!(f, "{key}"),
        }
    }
}

/// One visible entry, as a hosting screen renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEntry {
    pub entry: EntryRef,
    pub url: String,
    pub kind: FileKind,
    /// File name for staged entries; remote entries only have a URL.
    pub name: Option<String>,
    pub is_primary: bool,
}

impl PreviewEntry {
    pub fn is_remote(&self) -> bool {
        self.entry.is_remote()
    }
}

/// Result of a successful `stage` call.
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    /// Newly staged entries, in input order.
    pub staged: Vec<StagedFile>,
    /// Members dropped from the batch under `DropInvalid`.
    pub rejected: Vec<Rejection>,
}

impl StageOutcome {
    pub fn keys(&self) -> Vec<StagedKey> {
        self.staged.iter().map(|s| s.key).collect()
    }
}

#[derive(Debug)]
enum Entry {
    Remote { file: RemoteFile, removed: bool },
    Staged(StagedFile),
}

impl Entry {
    fn entry_ref(&self) -> EntryRef {
        match self {
            Self::Remote { file, .. } => EntryRef::Remote(file.id.clone()),
            Self::Staged(staged) => EntryRef::Staged(staged.key),
        }
    }

    fn is_visible(&self) -> bool {
        !matches!(self, Self::Remote { removed: true, .. })
    }

    fn url(&self) -> &str {
        match self {
            Self::Remote { file, .. } => &file.url,
            Self::Staged(staged) => staged.preview.as_str(),
        }
    }

    fn kind(&self) -> FileKind {
        match self {
            Self::Remote { file, .. } => file.kind,
            Self::Staged(staged) => staged.kind,
        }
    }
}

/// Upload session manager for one add/edit screen.
///
/// Call [`UploadSession::dispose`] on teardown. Dropping an undisposed
/// session disposes it as well, with a warning.
#[derive(Debug)]
pub struct UploadSession<S: PreviewStore = ObjectUrlStore> {
    policy: StagingPolicy,
    store: S,
    entries: Vec<Entry>,
    primary: Option<EntryRef>,
    next_key: u64,
    disposed: bool,
}

impl<S: PreviewStore> UploadSession<S> {
    /// Empty session for an "add" screen.
    pub fn new(policy: StagingPolicy, store: S) -> Self {
        Self {
            policy,
            store,
            entries: Vec::new(),
            primary: None,
            next_key: 0,
            disposed: false,
        }
    }

    /// Session for an "edit" screen, seeded with the entity's stored files.
    ///
    /// The first remote file in display order becomes primary.
    pub fn hydrate(
        policy: StagingPolicy,
        store: S,
        remote: Vec<RemoteFile>,
    ) -> Result<Self, UploadError> {
        Self::hydrate_with_primary(policy, store, remote, None)
    }

    /// Like [`Self::hydrate`], with the primary chosen by the server.
    pub fn hydrate_with_primary(
        policy: StagingPolicy,
        store: S,
        remote: Vec<RemoteFile>,
        primary: Option<RemoteId>,
    ) -> Result<Self, UploadError> {
        let mut ordered: Vec<(u32, RemoteFile)> = Vec::with_capacity(remote.len());
        for (position, file) in remote.into_iter().enumerate() {
            if ordered.iter().any(|(_, f)| f.id == file.id) {
                return Err(UploadError::DuplicateRemote { id: file.id });
            }
            let order = file
                .order
                .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));
            ordered.push((order, file));
        }
        // Stable: equal positions keep hydration order.
        ordered.sort_by_key(|(order, _)| *order);

        let mut session = Self::new(policy, store);
        session.entries = ordered
            .into_iter()
            .map(|(_, file)| Entry::Remote {
                file,
                removed: false,
            })
            .collect();

        session.primary = match primary {
            Some(id) => {
                let entry = EntryRef::Remote(id);
                if !session.is_visible(&entry) {
                    return Err(UploadError::NotFound { entry });
                }
                Some(entry)
            }
            None => session.first_visible(),
        };

        log::debug!(
            target: "campus_uploads::session",
            "hydrated remote={} primary={:?}",
            session.entries.len(),
            session.primary
        );
        Ok(session)
    }

    pub fn policy(&self) -> &StagingPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn primary(&self) -> Option<&EntryRef> {
        self.primary.as_ref()
    }

    /// Stages a batch of files.
    ///
    /// Invalid members are handled per [`InvalidMemberPolicy`]. When nothing
    /// can be staged the call fails and the session is left unchanged.
    pub fn stage(&mut self, files: Vec<SourceFile>) -> Result<StageOutcome, UploadError> {
        self.ensure_live()?;
        if files.is_empty() {
            return Ok(StageOutcome::default());
        }

        let mut accepted = Vec::with_capacity(files.len());
        let mut rejected = Vec::new();
        for file in files {
            match self.policy.check(&file) {
                Ok(kind) => accepted.push((file, kind)),
                Err(rejection) => {
                    log::warn!(
                        target: "campus_uploads::session",
                        "stage_rejected name={} mime={} reason={}",
                        file.name(),
                        file.mime_type(),
                        rejection.reason
                    );
                    rejected.push(rejection);
                }
            }
        }

        let reject_all = accepted.is_empty()
            || (!rejected.is_empty()
                && self.policy.on_invalid_member == InvalidMemberPolicy::RejectBatch);
        if reject_all {
            return Err(UploadError::from_rejections(rejected));
        }

        let staged: Vec<StagedFile> = accepted
            .into_iter()
            .map(|(source, kind)| {
                let key = StagedKey(self.next_key);
                self.next_key += 1;
                let preview = self.store.create(&source);
                let staged_at = Utc::now();
                log::trace!(
                    target: "campus_uploads::session",
                    "staged_file key={key} name={} kind={kind} at={}",
                    source.name(),
                    staged_at.to_rfc3339()
                );
                StagedFile {
                    key,
                    source,
                    preview,
                    kind,
                    staged_at,
                }
            })
            .collect();

        if self.primary.is_none() {
            self.primary = staged.first().map(|s| EntryRef::Staged(s.key));
        }
        self.entries
            .extend(staged.iter().cloned().map(Entry::Staged));

        log::debug!(
            target: "campus_uploads::session",
            "staged accepted={} rejected={} staged_total={}",
            staged.len(),
            rejected.len(),
            self.staged_files().count()
        );
        Ok(StageOutcome { staged, rejected })
    }

    /// Marks a stored file for deletion on submit.
    pub fn mark_remote_for_removal(&mut self, id: &RemoteId) -> Result<(), UploadError> {
        self.ensure_live()?;
        let slot = self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Remote { file, removed } if file.id == *id && !*removed => Some(removed),
            _ => None,
        });
        let Some(removed) = slot else {
            return Err(UploadError::NotFound {
                entry: EntryRef::Remote(id.clone()),
            });
        };
        *removed = true;

        log::debug!(target: "campus_uploads::session", "remote_marked_for_removal id={id}");
        self.reassign_primary_if(&EntryRef::Remote(id.clone()));
        Ok(())
    }

    /// Undoes [`Self::mark_remote_for_removal`]. The file returns
    /// to its original position.
    pub fn restore_remote(&mut self, id: &RemoteId) -> Result<(), UploadError> {
        self.ensure_live()?;
        let slot = self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Remote { file, removed } if file.id == *id && *removed => Some(removed),
            _ => None,
        });
        let Some(removed) = slot else {
            return Err(UploadError::NotFound {
                entry: EntryRef::Remote(id.clone()),
            });
        };
        *removed = false;

        if self.primary.is_none() {
            self.primary = Some(EntryRef::Remote(id.clone()));
        }
        Ok(())
    }

    /// Drops a staged file and revokes its preview.
    pub fn unstage(&mut self, key: StagedKey) -> Result<(), UploadError> {
        self.ensure_live()?;
        let position = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Staged(s) if s.key == key));

        let Some(position) = position else {
            return Err(if key.0 < self.next_key {
                UploadError::DoubleRelease { key }
            } else {
                UploadError::NotFound {
                    entry: EntryRef::Staged(key),
                }
            });
        };

        if let Entry::Staged(staged) = self.entries.remove(position) {
            self.store.revoke(&staged.preview);
            log::debug!(
                target: "campus_uploads::session",
                "unstaged key={key} name={} held_ms={}",
                staged.source.name(),
                staged.held_for(Utc::now()).num_milliseconds()
            );
        }
        self.reassign_primary_if(&EntryRef::Staged(key));
        Ok(())
    }

    /// Removes any visible entry, dispatching on its kind.
    pub fn remove(&mut self, entry: &EntryRef) -> Result<(), UploadError> {
        match entry {
            EntryRef::Remote(id) => self.mark_remote_for_removal(id),
            EntryRef::Staged(key) => self.unstage(*key),
        }
    }

    pub fn set_primary(&mut self, entry: EntryRef) -> Result<(), UploadError> {
        self.ensure_live()?;
        if !self.is_visible(&entry) {
            return Err(UploadError::NotFound { entry });
        }
        self.primary = Some(entry);
        Ok(())
    }

    pub fn clear_primary(&mut self) {
        self.primary = None;
    }

    /// Visible entries in display order: kept remote files, then staged files.
    pub fn preview_entries(&self) -> Vec<PreviewEntry> {
        self.visible()
            .map(|entry| {
                let entry_ref = entry.entry_ref();
                PreviewEntry {
                    is_primary: self.primary.as_ref() == Some(&entry_ref),
                    entry: entry_ref,
                    url: entry.url().to_owned(),
                    kind: entry.kind(),
                    name: match entry {
                        Entry::Staged(staged) => Some(staged.source.name().to_owned()),
                        Entry::Remote { .. } => None,
                    },
                }
            })
            .collect()
    }

    pub fn staged_files(&self) -> impl Iterator<Item = &StagedFile> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Staged(staged) => Some(staged),
            Entry::Remote { .. } => None,
        })
    }

    pub fn kept_remote_files(&self) -> impl Iterator<Item = &RemoteFile> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Remote { file, removed: false } => Some(file),
            _ => None,
        })
    }

    pub fn removed_remote_ids(&self) -> impl Iterator<Item = &RemoteId> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Remote { file, removed: true } => Some(&file.id),
            _ => None,
        })
    }

    /// Whether serializing now would change anything server-side.
    pub fn has_changes(&self) -> bool {
        self.removed_remote_ids().next().is_some() || self.staged_files().next().is_some()
    }

    /// Snapshots the session into a submission payload.
    ///
    /// The session stays usable, so a failed submission can be retried
    /// without picking the files again.
    pub fn serialize(&self) -> UploadPayload {
        let kept_remote: Vec<RemoteFile> = self.kept_remote_files().cloned().collect();
        let staged: Vec<&StagedFile> = self.staged_files().collect();

        let primary = self.primary.as_ref().and_then(|primary| match primary {
            EntryRef::Remote(id) => Some(PrimaryRef::Remote(id.clone())),
            EntryRef::Staged(key) => staged
                .iter()
                .position(|s| s.key == *key)
                .map(PrimaryRef::NewFile),
        });

        UploadPayload {
            keep_remote_ids: kept_remote.iter().map(|f| f.id.clone()).collect(),
            kept_remote,
            removed_remote_ids: self.removed_remote_ids().cloned().collect(),
            new_files: staged
                .into_iter()
                .map(|s| NewFile {
                    source: s.source.clone(),
                    kind: s.kind,
                })
                .collect(),
            primary,
        }
    }

    /// Revokes every live preview and releases staged files.
    ///
    /// Idempotent. Afterwards every mutating operation fails with
    /// [`UploadError::Disposed`]; remote entries stay readable.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        let mut released = 0;
        let store = &mut self.store;
        self.entries.retain(|entry| match entry {
            Entry::Staged(staged) => {
                store.revoke(&staged.preview);
                released += 1;
                false
            }
            Entry::Remote { .. } => true,
        });
        self.disposed = true;

        if matches!(self.primary, Some(EntryRef::Staged(_))) {
            self.primary = self.first_visible();
        }

        log::debug!(target: "campus_uploads::session", "disposed released={released}");
    }

    /// Gallery over the visible entries, opened at the first position.
    pub fn gallery(&self, filter: GalleryFilter) -> Gallery {
        Gallery::new(self.gallery_entries(filter).map(|(_, e)| e).collect())
    }

    /// Gallery opened at `entry`.
    ///
    /// The index is the entry's position within the filtered sequence, so
    /// opening the third thumbnail of a list whose first item is a PDF
    /// lands on the second image.
    pub fn open_gallery(
        &self,
        entry: &EntryRef,
        filter: GalleryFilter,
    ) -> Result<Gallery, UploadError> {
        let mut index = None;
        let mut entries = Vec::new();
        for (position, (entry_ref, gallery_entry)) in self.gallery_entries(filter).enumerate() {
            if entry_ref == *entry {
                index = Some(position);
            }
            entries.push(gallery_entry);
        }

        let index = index.ok_or_else(|| UploadError::NotFound {
            entry: entry.clone(),
        })?;
        let mut gallery = Gallery::new(entries);
        gallery.jump_to(index);
        Ok(gallery)
    }

    fn gallery_entries(
        &self,
        filter: GalleryFilter,
    ) -> impl Iterator<Item = (EntryRef, GalleryEntry)> + '_ {
        self.visible()
            .filter(move |entry| filter.admits(entry.kind()))
            .map(|entry| {
                (
                    entry.entry_ref(),
                    GalleryEntry {
                        url: entry.url().to_owned(),
                        is_remote: matches!(entry, Entry::Remote { .. }),
                        kind: entry.kind(),
                    },
                )
            })
    }

    fn visible(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|entry| entry.is_visible())
    }

    fn is_visible(&self, target: &EntryRef) -> bool {
        self.visible().any(|entry| entry.entry_ref() == *target)
    }

    fn first_visible(&self) -> Option<EntryRef> {
        self.visible().next().map(Entry::entry_ref)
    }

    fn reassign_primary_if(&mut self, removed: &EntryRef) {
        if self.primary.as_ref() == Some(removed) {
            self.primary = self.first_visible();
            log::debug!(
                target: "campus_uploads::session",
                "primary_reassigned from={removed} to={:?}",
                self.primary
            );
        }
    }

    fn ensure_live(&self) -> Result<(), UploadError> {
        if self.disposed {
            Err(UploadError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl<S: PreviewStore> Drop for UploadSession<S> {
    fn drop(&mut self) {
        if !self.disposed {
            let live = self.staged_files().count();
            if live > 0 {
                log::warn!(
                    target: "campus_uploads::session",
                    "session_dropped_without_dispose live_previews={live}"
                );
            }
            self.dispose();
        }
    }
}
