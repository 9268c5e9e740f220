//! Encoding an [`UploadPayload`] as the multipart form the API expects.
//!
//! Field layout:
//! - the entity's kept-files field, a JSON array of ids or file objects
//! - one binary part per new file under the repeated new-file field
//! - `primary`, when a primary file is designated
//! - any text fields the caller adds (entity metadata)
//!
//! Removed files are not listed; the server deletes whatever the kept list
//! leaves out.

use campus_uploads::{PrimaryRef, RemoteId, UploadPayload};
use serde::Serialize;

use crate::entity::{EntityProfile, KeepEncoding};
use crate::http::FormPart;

pub const PRIMARY_FIELD: &str = "primary";

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum PrimaryField<'a> {
    Existing { id: &'a RemoteId },
    New { index: usize },
}

impl<'a> From<&'a PrimaryRef> for PrimaryField<'a> {
    fn from(primary: &'a PrimaryRef) -> Self {
        match primary {
            PrimaryRef::Remote(id) => Self::Existing { id },
            PrimaryRef::NewFile(index) => Self::New { index: *index },
        }
    }
}

/// Ordered multipart fields for one create or update request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    parts: Vec<FormPart>,
}

impl SubmissionForm {
    pub fn build(
        payload: &UploadPayload,
        profile: &EntityProfile,
    ) -> Result<Self, serde_json::Error> {
        let kept = match profile.keep_encoding {
            KeepEncoding::Ids => serde_json::to_string(&payload.keep_remote_ids)?,
            KeepEncoding::Objects => serde_json::to_string(&payload.kept_remote)?,
        };

        let mut parts = Vec::with_capacity(payload.new_files.len() + 2);
        parts.push(FormPart::text(profile.keep_field, kept));
        parts.extend(payload.new_files.iter().map(|file| {
            FormPart::file(
                profile.new_file_field,
                file.source.name(),
                file.source.mime_type(),
                file.source.bytes(),
            )
        }));
        if let Some(primary) = &payload.primary {
            parts.push(FormPart::text(
                PRIMARY_FIELD,
                serde_json::to_string(&PrimaryField::from(primary))?,
            ));
        }

        Ok(Self { parts })
    }

    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::text(name, value));
        self
    }

    /// Appends a field holding `value` as JSON.
    pub fn with_json<T: Serialize>(
        self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        let encoded = serde_json::to_string(value)?;
        Ok(self.with_text(name, encoded))
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// First field called `name`.
    pub fn field(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|part| part.name == name)
    }

    pub fn fields<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormPart> + 'a {
        self.parts.iter().filter(move |part| part.name == name)
    }

    pub fn into_parts(self) -> Vec<FormPart> {
        self.parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::http::FormValue;
    use campus_uploads::{FileKind, NewFile, RemoteFile, SourceFile};
    use serde_json::{Value, json};

    fn payload() -> UploadPayload {
        let kept = vec![RemoteFile::new("4", "/uploads/4.png", FileKind::Image).with_order(0)];
        UploadPayload {
            keep_remote_ids: vec!["4".into()],
            kept_remote: kept,
            removed_remote_ids: vec!["5".into()],
            new_files: vec![
                NewFile {
                    source: SourceFile::new("a.png", "image/png", vec![1u8, 2]),
                    kind: FileKind::Image,
                },
                NewFile {
                    source: SourceFile::new("b.webp", "image/webp", vec![3u8]),
                    kind: FileKind::Image,
                },
            ],
            primary: Some(PrimaryRef::NewFile(1)),
        }
    }

    fn json_field(form: &SubmissionForm, name: &str) -> Value {
        let text = form.field(name).and_then(FormPart::as_text).unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_gallery_form_sends_kept_ids_and_repeated_images() {
        let form = SubmissionForm::build(&payload(), &EntityKind::News.profile()).unwrap();

        assert_eq!(json_field(&form, "existingImages"), json!(["4"]));
        let images: Vec<_> = form.fields("images").collect();
        assert_eq!(images.len(), 2);
        assert_eq!(
            images[0].value,
            FormValue::File {
                file_name: "a.png".to_owned(),
                mime_type: "image/png".to_owned(),
                bytes: vec![1, 2],
            }
        );
        assert_eq!(json_field(&form, PRIMARY_FIELD), json!({"kind": "new", "index": 1}));
    }

    #[test]
    fn test_file_parts_carry_normalised_mime() {
        let payload = UploadPayload {
            new_files: vec![NewFile {
                source: SourceFile::new("scan.pdf", "Application/PDF; name=scan.pdf", vec![9u8]),
                kind: FileKind::Pdf,
            }],
            ..UploadPayload::default()
        };
        let form = SubmissionForm::build(&payload, &EntityKind::Reform.profile()).unwrap();

        let part = form.field("file").unwrap();
        assert!(matches!(
            &part.value,
            FormValue::File { mime_type, .. } if mime_type == "application/pdf"
        ));
    }

    #[test]
    fn test_document_form_sends_kept_objects() {
        let form = SubmissionForm::build(&payload(), &EntityKind::Document.profile()).unwrap();

        assert_eq!(
            json_field(&form, "existingFiles"),
            json!([{"id": "4", "url": "/uploads/4.png", "type": "image", "order": 0}])
        );
        assert_eq!(form.fields("file").count(), 2);
        assert!(form.field("images").is_none());
    }

    #[test]
    fn test_removed_ids_are_not_sent() {
        let form = SubmissionForm::build(&payload(), &EntityKind::News.profile()).unwrap();
        assert!(
            form.parts()
                .iter()
                .filter_map(FormPart::as_text)
                .all(|text| !text.contains("\"5\""))
        );
    }

    #[test]
    fn test_existing_primary_and_no_primary() {
        let mut payload = payload();
        payload.primary = Some(PrimaryRef::Remote("4".into()));
        let form = SubmissionForm::build(&payload, &EntityKind::Activity.profile()).unwrap();
        assert_eq!(
            json_field(&form, PRIMARY_FIELD),
            json!({"kind": "existing", "id": "4"})
        );

        payload.primary = None;
        let form = SubmissionForm::build(&payload, &EntityKind::Activity.profile()).unwrap();
        assert!(form.field(PRIMARY_FIELD).is_none());
    }

    #[test]
    fn test_empty_payload_still_sends_empty_kept_list() {
        let form =
            SubmissionForm::build(&UploadPayload::default(), &EntityKind::Procedure.profile())
                .unwrap()
                .with_text("title", "Enrolment")
                .with_json("meta", &json!({"year": 2026}))
                .unwrap();

        assert_eq!(json_field(&form, "existingFiles"), json!([]));
        assert_eq!(form.field("title").and_then(FormPart::as_text), Some("Enrolment"));
        assert_eq!(json_field(&form, "meta"), json!({"year": 2026}));
        assert_eq!(form.into_parts().len(), 3);
    }
}
