//! File classification and the accepted MIME set.

use serde::{Deserialize, Deserializer, Serialize};

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_GIF: &str = "image/gif";
pub const MIME_WEBP: &str = "image/webp";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Classification of an attached file.
///
/// Staged files derive it from their declared MIME type; remote files carry
/// whatever the server reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
    Doc,
    Docx,
    #[default]
    Unknown,
}

impl FileKind {
    /// Classifies a MIME type. Parameters (`; charset=...`) and case are ignored.
    pub fn from_mime(mime_type: &str) -> Self {
        let essence = essence(mime_type);
        match essence.as_str() {
            MIME_PDF => Self::Pdf,
            MIME_DOC => Self::Doc,
            MIME_DOCX => Self::Docx,
            m if m.starts_with("image/") => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Parses the loose `type` strings servers send: a bare kind
    /// (`"image"`, `"pdf"`, ...), a MIME type, or a file extension.
    pub fn parse_lenient(raw: &str) -> Self {
        let lowered = raw.trim().trim_start_matches('.').to_ascii_lowercase();
        match lowered.as_str() {
            "image" | "img" | "jpg" | "jpeg" | "png" | "gif" | "webp" => Self::Image,
            "pdf" => Self::Pdf,
            "doc" => Self::Doc,
            "docx" => Self::Docx,
            other if other.contains('/') => Self::from_mime(other),
            _ => Self::Unknown,
        }
    }

    pub fn is_image(self) -> bool {
        self == Self::Image
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Unknown, Self::parse_lenient))
    }
}

/// Which families of MIME types a staging flow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptSet {
    /// JPEG, PNG, GIF (and `WebP` when enabled).
    Images,
    /// Images plus PDF, DOC and DOCX.
    Mixed,
}

impl AcceptSet {
    /// Returns the kind of an accepted MIME type, or `None` when refused.
    pub fn classify(self, mime_type: &str, accept_webp: bool) -> Option<FileKind> {
        let essence = essence(mime_type);
        let kind = match essence.as_str() {
            MIME_JPEG | MIME_PNG | MIME_GIF => FileKind::Image,
            MIME_WEBP if accept_webp => FileKind::Image,
            MIME_PDF => FileKind::Pdf,
            MIME_DOC => FileKind::Doc,
            MIME_DOCX => FileKind::Docx,
            _ => return None,
        };

        match self {
            Self::Images if !kind.is_image() => None,
            _ => Some(kind),
        }
    }
}

/// Lowercased MIME type without parameters: `"Image/PNG; q=1"` is `"image/png"`.
pub(crate) fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime() {
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Image);
        assert_eq!(FileKind::from_mime("IMAGE/JPEG"), FileKind::Image);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime(MIME_DOC), FileKind::Doc);
        assert_eq!(FileKind::from_mime(MIME_DOCX), FileKind::Docx);
        assert_eq!(FileKind::from_mime("text/plain"), FileKind::Unknown);
        assert_eq!(FileKind::from_mime(""), FileKind::Unknown);
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(FileKind::parse_lenient("image"), FileKind::Image);
        assert_eq!(FileKind::parse_lenient(" PDF "), FileKind::Pdf);
        assert_eq!(FileKind::parse_lenient(".docx"), FileKind::Docx);
        assert_eq!(FileKind::parse_lenient("image/gif"), FileKind::Image);
        assert_eq!(FileKind::parse_lenient("spreadsheet"), FileKind::Unknown);
    }

    #[test]
    fn test_deserialize_missing_type_is_unknown() {
        let kind: FileKind = serde_json::from_str("null").unwrap();
        assert_eq!(kind, FileKind::Unknown);
        let kind: FileKind = serde_json::from_str("\"application/pdf\"").unwrap();
        assert_eq!(kind, FileKind::Pdf);
    }

    #[test]
    fn test_webp_only_when_enabled() {
        assert_eq!(AcceptSet::Images.classify(MIME_WEBP, true), Some(FileKind::Image));
        assert_eq!(AcceptSet::Images.classify(MIME_WEBP, false), None);
        assert_eq!(AcceptSet::Mixed.classify(MIME_WEBP, false), None);
    }

    #[test]
    fn test_images_only_refuses_documents() {
        assert_eq!(AcceptSet::Images.classify(MIME_PDF, true), None);
        assert_eq!(AcceptSet::Mixed.classify(MIME_PDF, false), Some(FileKind::Pdf));
        assert_eq!(
            AcceptSet::Mixed.classify("application/pdf; name=x.pdf", false),
            Some(FileKind::Pdf)
        );
    }

    #[test]
    fn test_executables_are_never_accepted() {
        assert_eq!(AcceptSet::Mixed.classify("application/x-msdownload", true), None);
        assert_eq!(AcceptSet::Mixed.classify("image/svg+xml", true), None);
    }
}
