//! List the files stored for an entity.

use anyhow::{Context as _, Result};
use campus_business::{EntityKind, Submitter};
use campus_uploads::{EntryRef, PreviewEntry};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::instrument;

use crate::output::Output;
use crate::utils::truncate_str;

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Primary")]
    primary: &'static str,
}

impl FileRow {
    fn new(position: usize, entry: &PreviewEntry) -> Self {
        let id = match &entry.entry {
            EntryRef::Remote(id) => id.to_string(),
            EntryRef::Staged(key) => key.to_string(),
        };
        Self {
            position: position + 1,
            id,
            kind: entry.kind.to_string(),
            url: truncate_str(&entry.url, 48),
            primary: if entry.is_primary { "★" } else { "" },
        }
    }
}

/// Prints the entity's stored files in display order and returns them.
#[instrument(skip_all, name = "files", fields(entity = %entity, id))]
pub async fn run_files(
    submitter: &Submitter,
    entity: EntityKind,
    id: &str,
) -> Result<Vec<PreviewEntry>> {
    let out = Output::new();

    let (_, mut session) = submitter
        .fetch_session(entity, id)
        .await
        .with_context(|| format!("Failed to load {entity} {id}"))?;
    let entries = session.preview_entries();
    session.dispose();

    if entries.is_empty() {
        out.dim(format!("No files stored for {entity} {id}."));
        return Ok(entries);
    }

    let rows: Vec<FileRow> = entries
        .iter()
        .enumerate()
        .map(|(position, entry)| FileRow::new(position, entry))
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    out.header(format!("{entity} {id}"));
    out.print(table.to_string());
    out.total("Total", entries.len());

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_business::BusinessConfig;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_files_are_listed_in_display_order() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/procedures/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3,
                "files": [
                    {"id": 11, "url": "/f/form.docx", "type": "docx", "order": 1},
                    {"id": 10, "url": "/f/guide.pdf", "type": "pdf", "order": 0}
                ]
            })))
            .mount(&mock_server)
            .await;

        let submitter = Submitter::new(BusinessConfig::new(mock_server.uri()));
        let entries = run_files(&submitter, EntityKind::Procedure, "3")
            .await
            .unwrap();

        let ids: Vec<String> = entries.iter().map(|e| e.entry.to_string()).collect();
        assert_eq!(ids, vec!["remote 10", "remote 11"]);
        assert!(entries[0].is_primary);
    }

    #[tokio::test]
    async fn test_missing_entity_reports_server_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/news/404"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "News not found"})),
            )
            .mount(&mock_server)
            .await;

        let submitter = Submitter::new(BusinessConfig::new(mock_server.uri()));
        let err = run_files(&submitter, EntityKind::News, "404")
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("News not found"));
    }
}
