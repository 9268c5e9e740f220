//! Create an entity with files, or edit the files of an existing one.

use anyhow::{Context as _, Result, bail};
use campus_business::{EntityProfile, SubmissionForm, Submitter};
use campus_uploads::{
    EntryRef, ObjectUrlStore, PreviewEntry, PrimaryRef, RemoteId, StageOutcome, UploadPayload,
    UploadSession,
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::cli::{PrimaryArg, UploadArgs};
use crate::output::Output;
use crate::utils::{format_size, read_source_file};

#[derive(Debug)]
pub enum UploadOutcome {
    /// `--dry-run`: the payload that would have been sent.
    DryRun(UploadPayload),
    Created(Value),
    Updated(Value),
}

/// Runs one upload. The session is disposed whether or not it succeeds.
#[instrument(skip_all, name = "upload", fields(
    entity = %args.entity,
    id = args.id.as_deref().unwrap_or("new"),
    file_count = args.file.len(),
    dry_run = args.dry_run,
))]
pub async fn run_upload(submitter: &Submitter, args: UploadArgs) -> Result<UploadOutcome> {
    let out = Output::new();
    let profile = args.entity.profile();

    let mut session = match &args.id {
        Some(id) => {
            let (_, session) = submitter
                .fetch_session(args.entity, id)
                .await
                .with_context(|| format!("Failed to load {} {id}", args.entity))?;
            session
        }
        None => profile.new_session(),
    };

    let result = edit_and_submit(submitter, &profile, &mut session, &args, &out).await;
    session.dispose();
    result
}

async fn edit_and_submit(
    submitter: &Submitter,
    profile: &EntityProfile,
    session: &mut UploadSession<ObjectUrlStore>,
    args: &UploadArgs,
    out: &Output,
) -> Result<UploadOutcome> {
    let sources = args
        .file
        .iter()
        .map(|path| read_source_file(path))
        .collect::<Result<Vec<_>>>()?;

    let outcome = session.stage(sources)?;
    for rejection in &outcome.rejected {
        out.warning(format!("Skipped {rejection}"));
    }

    for id in &args.remove {
        session.mark_remote_for_removal(&RemoteId::new(id.as_str()))?;
    }

    if let Some(primary) = &args.primary {
        session.set_primary(resolve_primary(primary, &outcome)?)?;
    }

    print_preview(session, out);

    if args.id.is_some() && !session.has_changes() && args.fields.is_empty() {
        out.info("No file changes; the entity will be re-saved as is");
    }

    let payload = session.serialize();
    let mut form = SubmissionForm::build(&payload, profile)?;
    for (key, value) in &args.fields {
        form = form.with_text(key.as_str(), value.as_str());
    }

    if args.dry_run {
        print_payload(&payload, profile, out);
        return Ok(UploadOutcome::DryRun(payload));
    }

    info!(
        new_files = payload.new_files.len(),
        bytes = payload.upload_size(),
        "submitting"
    );

    match &args.id {
        Some(id) => {
            let response = submitter.update(args.entity, id, form).await?;
            out.success(format!("Updated {} {id}", args.entity));
            Ok(UploadOutcome::Updated(response))
        }
        None => {
            let response = submitter.create(args.entity, form).await?;
            match response.get("id") {
                Some(id) => out.success(format!("Created {} {id}", args.entity)),
                None => out.success(format!("Created {}", args.entity)),
            }
            Ok(UploadOutcome::Created(response))
        }
    }
}

fn resolve_primary(primary: &PrimaryArg, outcome: &StageOutcome) -> Result<EntryRef> {
    match primary {
        PrimaryArg::Existing(id) => Ok(EntryRef::Remote(RemoteId::new(id.as_str()))),
        PrimaryArg::New(index) => match outcome.staged.get(*index) {
            Some(staged) => Ok(EntryRef::Staged(staged.key)),
            None => bail!(
                "--primary new:{index} is out of range ({} file(s) staged)",
                outcome.staged.len()
            ),
        },
    }
}

/// Name, kind and size columns for one preview line. Stored files have no
/// local size.
fn preview_row(entry: &PreviewEntry, size: Option<u64>) -> (String, String, String) {
    let label = entry.name.clone().unwrap_or_else(|| entry.url.clone());
    let origin = if entry.is_remote() { "stored" } else { "new" };
    let kind = if entry.is_primary {
        format!("{} {origin}, primary", entry.kind)
    } else {
        format!("{} {origin}", entry.kind)
    };
    let size = size.map_or_else(|| "on server".to_owned(), format_size);
    (label, kind, size)
}

fn print_preview(session: &UploadSession<ObjectUrlStore>, out: &Output) {
    let entries = session.preview_entries();
    if entries.is_empty() {
        out.dim("No files attached.");
        return;
    }

    for entry in &entries {
        let size = match &entry.entry {
            EntryRef::Staged(key) => session
                .staged_files()
                .find(|staged| staged.key == *key)
                .map(|staged| staged.source.size()),
            EntryRef::Remote(_) => None,
        };
        let (label, kind, size) = preview_row(entry, size);
        out.file_item(label, kind, size);
    }
    out.total("Attached", entries.len());
}

fn print_payload(payload: &UploadPayload, profile: &EntityProfile, out: &Output) {
    out.newline();
    out.header("Dry run: nothing was sent");
    let kept: Vec<&str> = payload.keep_remote_ids.iter().map(RemoteId::as_str).collect();
    let removed: Vec<&str> = payload
        .removed_remote_ids
        .iter()
        .map(RemoteId::as_str)
        .collect();
    out.labeled(profile.keep_field, format!("[{}]", kept.join(", ")));
    out.labeled("removed", format!("[{}]", removed.join(", ")));
    for file in &payload.new_files {
        out.labeled(
            profile.new_file_field,
            format!("{} ({})", file.source.name(), format_size(file.source.size())),
        );
    }
    let primary = match &payload.primary {
        Some(PrimaryRef::Remote(id)) => format!("existing {id}"),
        Some(PrimaryRef::NewFile(index)) => format!("new file #{index}"),
        None => "none".to_owned(),
    };
    out.labeled("primary", primary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_business::{BusinessConfig, EntityKind};
    use campus_uploads::{ErrorKind, FileKind, SourceFile, UploadError};
    use serde_json::json;
    use std::path::PathBuf;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn file(&self, name: &str, len: usize) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, vec![7u8; len]).unwrap();
            path
        }
    }

    fn args(entity: EntityKind) -> UploadArgs {
        UploadArgs {
            entity,
            id: None,
            file: Vec::new(),
            remove: Vec::new(),
            primary: None,
            fields: Vec::new(),
            dry_run: false,
        }
    }

    fn offline() -> Submitter {
        Submitter::new(BusinessConfig::new("http://127.0.0.1:9"))
    }

    #[test]
    fn test_preview_row_puts_size_and_primary_in_their_columns() {
        let mut session = EntityKind::Document.profile().new_session();
        session
            .stage(vec![SourceFile::new("rules.pdf", "application/pdf", vec![0u8; 2048])])
            .unwrap();
        let entries = session.preview_entries();
        assert_eq!(
            preview_row(&entries[0], Some(2048)),
            ("rules.pdf".to_owned(), "pdf new, primary".to_owned(), format_size(2048))
        );
        session.dispose();

        let stored = PreviewEntry {
            entry: EntryRef::Remote("3".into()),
            url: "/uploads/3.png".to_owned(),
            kind: FileKind::Image,
            name: None,
            is_primary: false,
        };
        assert_eq!(
            preview_row(&stored, None),
            ("/uploads/3.png".to_owned(), "image stored".to_owned(), "on server".to_owned())
        );
    }

    #[tokio::test]
    async fn test_dry_run_filters_invalid_documents() {
        let fixture = Fixture::new();
        let mut args = args(EntityKind::Document);
        args.file = vec![fixture.file("rules.pdf", 32), fixture.file("notes.txt", 4)];
        args.dry_run = true;

        let outcome = run_upload(&offline(), args).await.unwrap();
        let UploadOutcome::DryRun(payload) = outcome else {
            panic!("expected dry run, got {outcome:?}");
        };
        assert_eq!(payload.new_files.len(), 1);
        assert_eq!(payload.new_files[0].source.name(), "rules.pdf");
        assert_eq!(payload.primary, Some(PrimaryRef::NewFile(0)));
    }

    #[tokio::test]
    async fn test_gallery_rejects_mixed_selection() {
        let fixture = Fixture::new();
        let mut args = args(EntityKind::News);
        args.file = vec![fixture.file("a.png", 16), fixture.file("b.pdf", 16)];
        args.dry_run = true;

        let err = run_upload(&offline(), args).await.unwrap_err();
        let upload_err = err.downcast_ref::<UploadError>().unwrap();
        assert_eq!(upload_err.kind(), ErrorKind::UnsupportedFileType);
        assert_eq!(upload_err.rejected()[0].name, "b.pdf");
    }

    #[tokio::test]
    async fn test_primary_index_out_of_range() {
        let fixture = Fixture::new();
        let mut args = args(EntityKind::Activity);
        args.file = vec![fixture.file("a.png", 16)];
        args.primary = Some(PrimaryArg::New(3));
        args.dry_run = true;

        let err = run_upload(&offline(), args).await.unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_edit_replaces_removed_image() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/activities/8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 8,
                "images": [
                    {"id": 1, "url": "/uploads/1.png", "type": "image"},
                    {"id": 2, "url": "/uploads/2.png", "type": "image"}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/activities/8"))
            .and(header("Authorization", "Bearer t0k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 8})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fixture = Fixture::new();
        let mut args = args(EntityKind::Activity);
        args.id = Some("8".to_owned());
        args.file = vec![fixture.file("fair.jpg", 64)];
        args.remove = vec!["1".to_owned()];
        args.primary = Some(PrimaryArg::New(0));
        args.fields = vec![("title".to_owned(), "Science fair".to_owned())];

        let submitter =
            Submitter::new(BusinessConfig::new(mock_server.uri()).with_token("t0k"));
        let outcome = run_upload(&submitter, args).await.unwrap();
        assert!(matches!(outcome, UploadOutcome::Updated(ref body) if body["id"] == 8));

        let requests = mock_server.received_requests().await.unwrap();
        let put = requests
            .iter()
            .find(|r| r.method.as_str() == "PUT")
            .unwrap();
        let body = String::from_utf8_lossy(&put.body);
        assert!(body.contains("[\"2\"]"));
        assert!(body.contains("filename=\"fair.jpg\""));
        assert!(body.contains("Science fair"));
        assert!(body.contains(r#"{"kind":"new","index":0}"#));
    }

    #[tokio::test]
    async fn test_removing_unknown_file_fails_before_submitting() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reforms/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "files": []})))
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let mut args = args(EntityKind::Reform);
        args.id = Some("2".to_owned());
        args.remove = vec!["77".to_owned()];

        let submitter = Submitter::new(BusinessConfig::new(mock_server.uri()));
        let err = run_upload(&submitter, args).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<UploadError>().map(UploadError::kind),
            Some(ErrorKind::NotFound)
        );
    }
}
