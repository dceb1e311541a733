use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::{Department, DocumentUploadRequest, Visibility};

/// Body sent to the upload intent endpoint to obtain a presigned POST target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadIntentBody {
    pub title: String,
    pub department: Department,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub file_extension: String,
    pub content_type: String,
}

impl UploadIntentBody {
    /// Build the wire body, substituting `fallback` when no department was chosen.
    pub fn from_request(request: &DocumentUploadRequest, fallback: Department) -> Self {
        Self {
            title: request.title.clone(),
            department: request.department.unwrap_or(fallback),
            tags: request.tags.clone(),
            visibility: request.visibility,
            file_extension: request.file_extension.clone(),
            content_type: request.content_type.clone(),
        }
    }
}

impl From<&DocumentUploadRequest> for UploadIntentBody {
    fn from(request: &DocumentUploadRequest) -> Self {
        Self::from_request(request, Department::default())
    }
}

/// Single-use authorization to write one object to storage.
///
/// Fields keep the order in which the backend returned them. The descriptor is
/// consumed by the upload and cannot be cloned or reused.
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "PresignedPost")]
pub struct UploadDescriptor {
    pub url: String,
    pub fields: Vec<(String, String)>,
}

#[derive(Deserialize)]
struct PresignedPost {
    url: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl From<PresignedPost> for UploadDescriptor {
    fn from(post: PresignedPost) -> Self {
        let fields = post
            .fields
            .into_iter()
            .filter_map(|(name, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((name, s)),
                other => Some((name, other.to_string())),
            })
            .collect();
        UploadDescriptor {
            url: post.url,
            fields,
        }
    }
}

impl UploadDescriptor {
    pub fn new(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            fields,
        }
    }

    /// Value of a required field, matched case-insensitively.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Object key the storage service will write, when the backend provided one.
    pub fn object_key(&self) -> Option<&str> {
        self.field("key")
    }
}
