//! Turning an entity record fetched from the API into an edit session.

use campus_uploads::{
    ObjectUrlStore, PreviewStore, RemoteFile, RemoteId, UploadError, UploadSession,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::entity::EntityProfile;

#[derive(Debug, Error)]
pub enum HydrateError {
    #[error("`{key}` must be a list of files, got {found}")]
    NotAList { key: &'static str, found: &'static str },

    #[error("file #{index} in `{key}` is malformed: {source}")]
    InvalidFile {
        key: &'static str,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Session(#[from] UploadError),
}

/// Reads the entity's stored files from its record.
///
/// A missing or `null` key means no files. A single object is accepted as a
/// one-element list. Ids may be strings or numbers.
pub fn remote_files_from_entity(
    entity: &Value,
    profile: &EntityProfile,
) -> Result<Vec<RemoteFile>, HydrateError> {
    let key = profile.files_key;
    let items = match entity.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items.as_slice(),
        Some(single @ Value::Object(_)) => std::slice::from_ref(single),
        Some(other) => {
            return Err(HydrateError::NotAList {
                key,
                found: type_name(other),
            });
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            RemoteFile::deserialize(item)
                .map_err(|source| HydrateError::InvalidFile { key, index, source })
        })
        .collect()
}

/// Primary file chosen server-side, if the record names one.
pub fn primary_from_entity(entity: &Value) -> Option<RemoteId> {
    match entity.get("primary")? {
        Value::String(id) if !id.is_empty() => Some(RemoteId::new(id.as_str())),
        Value::Number(id) => Some(RemoteId::new(id.to_string())),
        _ => None,
    }
}

/// Edit session seeded from an entity record.
pub fn session_from_entity(
    entity: &Value,
    profile: &EntityProfile,
) -> Result<UploadSession, HydrateError> {
    session_from_entity_with(entity, profile, ObjectUrlStore::new())
}

pub fn session_from_entity_with<S: PreviewStore>(
    entity: &Value,
    profile: &EntityProfile,
    store: S,
) -> Result<UploadSession<S>, HydrateError> {
    let remote = remote_files_from_entity(entity, profile)?;
    let primary = primary_from_entity(entity).filter(|id| remote.iter().any(|f| f.id == *id));
    Ok(UploadSession::hydrate_with_primary(
        profile.policy.clone(),
        store,
        remote,
        primary,
    )?)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
