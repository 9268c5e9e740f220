//! Submission layer for campus upload sessions.
//!
//! Maps each entity screen to its endpoint and form fields, seeds edit
//! sessions from fetched records, and sends session payloads as multipart
//! forms.

mod config;
pub mod entity;
pub mod http;
pub mod hydrate;
pub mod multipart;
pub mod submit;

pub use config::{BusinessConfig, ENV_PREFIX};
pub use entity::{EntityKind, EntityProfile, KeepEncoding, ParseEntityKindError};
pub use hydrate::{HydrateError, remote_files_from_entity, session_from_entity};
pub use multipart::SubmissionForm;
pub use submit::{SubmitError, Submitter};
