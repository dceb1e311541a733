use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Department a document belongs to.
///
/// The backend falls back to `Engineering` when the user leaves the field unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    #[default]
    Engineering,
    Finance,
    Marketing,
    Sales,
    Hr,
    Legal,
    Operations,
}

impl Department {
    pub const ALL: [Department; 7] = [
        Department::Engineering,
        Department::Finance,
        Department::Marketing,
        Department::Sales,
        Department::Hr,
        Department::Legal,
        Department::Operations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Engineering => "engineering",
            Department::Finance => "finance",
            Department::Marketing => "marketing",
            Department::Sales => "sales",
            Department::Hr => "hr",
            Department::Legal => "legal",
            Department::Operations => "operations",
        }
    }
}

impl FromStr for Department {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Department::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Invalid department: {}", s))
    }
}

impl Display for Department {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Who may see an uploaded document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    Public,
    #[default]
    TeamOnly,
    Private,
}

impl FromStr for Visibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "team-only" | "team_only" | "team" => Ok(Visibility::TeamOnly),
            "private" => Ok(Visibility::Private),
            _ => Err(anyhow::anyhow!("Invalid visibility: {}", s)),
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::TeamOnly => write!(f, "team-only"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// A file chosen by the user, held in memory until it is uploaded.
///
/// No type or size restriction is applied here; the backend and the storage
/// service decide what they accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    /// Create a file from its name and content, deriving the content type from the extension.
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = content_type_for_extension(&extension_of(&name)).to_string();
        Self {
            name,
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Override the derived content type (e.g. when the picker reports one).
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        tracing::debug!(file = %name, size = bytes.len(), "Loaded file for upload");
        Ok(Self::new(name, bytes))
    }

    /// Lowercase extension without the dot, or an empty string.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    /// File name with its extension stripped ("q3.pdf" -> "q3").
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(0) | None => &self.name,
            Some(idx) => &self.name[..idx],
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn extension_of(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename[idx + 1..].to_lowercase(),
        _ => String::new(),
    }
}

/// Map a file extension to the MIME type sent as the document's content type.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        // Archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}

/// Parse the free-text tag field: comma separated, trimmed, empty entries dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// User-supplied intent to add a document.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct DocumentUploadRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub department: Option<Department>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub file_extension: String,
    pub content_type: String,
}

impl DocumentUploadRequest {
    /// Build a request from raw form values and the selected file.
    pub fn from_form(
        title: &str,
        department: Option<Department>,
        raw_tags: &str,
        visibility: Visibility,
        file: &SelectedFile,
    ) -> Self {
        Self {
            title: title.trim().to_string(),
            department,
            tags: parse_tags(raw_tags),
            visibility,
            file_extension: file.extension(),
            content_type: file.content_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_trims_and_drops_empty() {
        assert_eq!(parse_tags("a, b ,,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_tags("finance, q3"), vec!["finance", "q3"]);
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,").is_empty());
    }

    #[test]
    fn test_selected_file_derives_metadata() {
        let file = SelectedFile::new("Q3.Report.PDF", vec![1u8, 2, 3]);
        assert_eq!(file.extension(), "pdf");
        assert_eq!(file.stem(), "Q3.Report");
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.size(), 3);
    }

    #[test]
    fn test_selected_file_without_extension() {
        let file = SelectedFile::new("README", Vec::<u8>::new());
        assert_eq!(file.extension(), "");
        assert_eq!(file.stem(), "README");
        assert_eq!(file.content_type, "application/octet-stream");

        let hidden = SelectedFile::new(".env", Vec::<u8>::new());
        assert_eq!(hidden.extension(), "");
        assert_eq!(hidden.stem(), ".env");
    }

    #[test]
    fn test_department_parsing_and_default() {
        assert_eq!(Department::default(), Department::Engineering);
        assert_eq!("Finance".parse::<Department>().unwrap(), Department::Finance);
        assert!("astrology".parse::<Department>().is_err());
        assert_eq!(
            serde_json::to_value(Department::Hr).unwrap(),
            serde_json::json!("hr")
        );
    }

    #[test]
    fn test_visibility_wire_format() {
        assert_eq!(Visibility::default(), Visibility::TeamOnly);
        assert_eq!(
            serde_json::to_value(Visibility::TeamOnly).unwrap(),
            serde_json::json!("team-only")
        );
        assert_eq!("team".parse::<Visibility>().unwrap(), Visibility::TeamOnly);
        assert_eq!(Visibility::Private.to_string(), "private");
    }

    #[test]
    fn test_request_from_form_validates_title() {
        let file = SelectedFile::new("notes.txt", b"hello".to_vec());
        let request =
            DocumentUploadRequest::from_form("   ", None, "", Visibility::Private, &file);
        assert!(request.validate().is_err());

        let request = DocumentUploadRequest::from_form(
            "  Notes ",
            Some(Department::Legal),
            "x,, y",
            Visibility::Private,
            &file,
        );
        assert!(request.validate().is_ok());
        assert_eq!(request.title, "Notes");
        assert_eq!(request.tags, vec!["x", "y"]);
        assert_eq!(request.file_extension, "txt");
        assert_eq!(request.content_type, "text/plain");
    }

    #[test]
    fn test_long_title_is_accepted() {
        let file = SelectedFile::new("notes.txt", b"hello".to_vec());
        let title = "x".repeat(300);
        let request =
            DocumentUploadRequest::from_form(&title, None, "", Visibility::Private, &file);
        assert!(request.validate().is_ok());
        assert_eq!(request.title.len(), 300);
    }

    #[tokio::test]
    async fn test_selected_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budget.xlsx");
        std::fs::write(&path, b"sheet").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "budget.xlsx");
        assert_eq!(
            file.content_type,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(file.bytes.as_ref(), b"sheet");

        assert!(SelectedFile::from_path(dir.path().join("missing.pdf"))
            .await
            .is_err());
    }
}
