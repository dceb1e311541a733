//! Direct upload of a file to object storage using a presigned POST descriptor.
//!
//! The storage service validates the request as a signed form, so the
//! descriptor fields are written in a fixed canonical order, followed by any
//! other descriptor fields, with the file part always last.

use lyra_core::{SelectedFile, UploadDescriptor, UploadError};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Serialize;

/// Signed-form fields, in the order they must appear in the multipart body.
pub const CANONICAL_FIELD_ORDER: [&str; 8] = [
    "Content-Type",
    "key",
    "x-amz-algorithm",
    "x-amz-credential",
    "x-amz-date",
    "x-amz-security-token",
    "policy",
    "x-amz-signature",
];

/// Name of the multipart part carrying the file content.
const FILE_FIELD: &str = "file";

fn is_canonical(name: &str) -> bool {
    CANONICAL_FIELD_ORDER
        .iter()
        .any(|canonical| canonical.eq_ignore_ascii_case(name))
}

/// Descriptor fields in submission order: canonical fields first (in canonical
/// order, names matched case-insensitively), then the rest in descriptor order.
pub fn ordered_form_fields(descriptor: &UploadDescriptor) -> Vec<(&str, &str)> {
    let mut ordered = Vec::with_capacity(descriptor.fields.len());

    for canonical in CANONICAL_FIELD_ORDER {
        if let Some((name, value)) = descriptor
            .fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(canonical))
        {
            ordered.push((name.as_str(), value.as_str()));
        }
    }

    ordered.extend(
        descriptor
            .fields
            .iter()
            .filter(|(name, _)| !is_canonical(name))
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );

    ordered
}

/// Where the storage service wrote the object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: Option<String>,
    /// `Location` header returned by the storage service, when present
    pub location: Option<String>,
    pub status: u16,
}

/// A multipart submission ready to send. Built from a consumed descriptor.
#[derive(Debug)]
pub struct PreparedUpload {
    url: String,
    key: Option<String>,
    field_names: Vec<String>,
    form: Form,
}

impl PreparedUpload {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Part names in the order they are written, file part included.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }
}

/// Sends presigned POST uploads. Storage requests carry no bearer credential.
#[derive(Clone, Debug)]
pub struct DirectUploader {
    client: Client,
}

impl DirectUploader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build the multipart form for `file`, consuming the descriptor.
    pub fn prepare(
        &self,
        descriptor: UploadDescriptor,
        file: &SelectedFile,
    ) -> Result<PreparedUpload, UploadError> {
        let mut form = Form::new();
        let mut field_names = Vec::with_capacity(descriptor.fields.len() + 1);

        for (name, value) in ordered_form_fields(&descriptor) {
            field_names.push(name.to_string());
            form = form.text(name.to_string(), value.to_string());
        }

        let part = Part::stream_with_length(Body::from(file.bytes.clone()), file.size() as u64)
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| UploadError::UploadRejected {
                status: None,
                body: format!("Invalid content type {}: {}", file.content_type, e),
            })?;
        form = form.part(FILE_FIELD, part);
        field_names.push(FILE_FIELD.to_string());

        let key = descriptor.object_key().map(str::to_string);
        Ok(PreparedUpload {
            url: descriptor.url,
            key,
            field_names,
            form,
        })
    }

    /// Submit a prepared upload. Any non-2xx status is `UploadRejected` with the storage error body.
    pub async fn send(&self, prepared: PreparedUpload) -> Result<StoredObject, UploadError> {
        // No explicit content type: reqwest sets multipart/form-data with the boundary.
        let response = self
            .client
            .post(&prepared.url)
            .multipart(prepared.form)
            .send()
            .await
            .map_err(UploadError::storage_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                url = %prepared.url,
                status = %status,
                body = %error_text,
                "Storage rejected upload"
            );
            return Err(UploadError::UploadRejected {
                status: Some(status.as_u16()),
                body: error_text,
            });
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::info!(
            key = prepared.key.as_deref().unwrap_or("-"),
            status = %status,
            "Upload stored"
        );

        Ok(StoredObject {
            key: prepared.key,
            location,
            status: status.as_u16(),
        })
    }

    /// Prepare and send in one step.
    pub async fn upload(
        &self,
        descriptor: UploadDescriptor,
        file: &SelectedFile,
    ) -> Result<StoredObject, UploadError> {
        let prepared = self.prepare(descriptor, file)?;
        self.send(prepared).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_descriptor(url: &str) -> UploadDescriptor {
        // Deliberately shuffled relative to the canonical order.
        UploadDescriptor::new(
            url,
            fields(&[
                ("x-amz-signature", "sig"),
                ("success_action_status", "201"),
                ("policy", "pol"),
                ("key", "docs/q3.pdf"),
                ("x-amz-date", "20240101T000000Z"),
                ("x-amz-meta-title", "Q3 Report"),
                ("X-Amz-Credential", "cred"),
                ("x-amz-security-token", "tok"),
                ("x-amz-algorithm", "AWS4-HMAC-SHA256"),
                ("Content-Type", "application/pdf"),
            ]),
        )
    }

    #[test]
    fn test_canonical_order_then_extras() {
        let descriptor = full_descriptor("https://bucket.example.com/");
        let names: Vec<&str> = ordered_form_fields(&descriptor)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Content-Type",
                "key",
                "x-amz-algorithm",
                "X-Amz-Credential",
                "x-amz-date",
                "x-amz-security-token",
                "policy",
                "x-amz-signature",
                "success_action_status",
                "x-amz-meta-title",
            ]
        );
    }

    #[test]
    fn test_order_independent_of_descriptor_order() {
        let forward = UploadDescriptor::new(
            "u",
            fields(&[("policy", "p"), ("key", "k"), ("extra", "e")]),
        );
        let backward = UploadDescriptor::new(
            "u",
            fields(&[("extra", "e"), ("key", "k"), ("policy", "p")]),
        );
        assert_eq!(ordered_form_fields(&forward), ordered_form_fields(&backward));
        assert_eq!(
            ordered_form_fields(&forward),
            vec![("key", "k"), ("policy", "p"), ("extra", "e")]
        );
    }

    #[test]
    fn test_prepare_appends_file_last() {
        let uploader = DirectUploader::new(Client::new());
        let file = SelectedFile::new("q3.pdf", b"%PDF-1.7".to_vec());
        let prepared = uploader
            .prepare(full_descriptor("https://bucket.example.com/"), &file)
            .unwrap();

        assert_eq!(prepared.url(), "https://bucket.example.com/");
        let names = prepared.field_names();
        assert_eq!(names.len(), 11);
        assert_eq!(names.first().map(String::as_str), Some("Content-Type"));
        assert_eq!(names.last().map(String::as_str), Some("file"));
    }

    #[test]
    fn test_prepare_rejects_unparseable_content_type() {
        let uploader = DirectUploader::new(Client::new());
        let file = SelectedFile::new("q3.pdf", b"%PDF".to_vec()).with_content_type("not a mime");
        let err = uploader
            .prepare(full_descriptor("https://bucket.example.com/"), &file)
            .unwrap_err();

        match err {
            UploadError::UploadRejected { status, body } => {
                assert_eq!(status, None);
                assert!(body.contains("not a mime"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", Matcher::Missing)
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"(?s)name="Content-Type".*name="key".*name="policy".*name="x-amz-signature".*name="x-amz-meta-title".*name="file"; filename="q3.pdf""#.to_string()),
                Matcher::Regex("%PDF-1.7".to_string()),
            ]))
            .with_status(204)
            .with_header("location", "https://bucket.example.com/docs/q3.pdf")
            .create_async()
            .await;

        let uploader = DirectUploader::new(Client::new());
        let file = SelectedFile::new("q3.pdf", b"%PDF-1.7".to_vec());
        let stored = uploader
            .upload(full_descriptor(&format!("{}/", server.url())), &file)
            .await
            .unwrap();

        assert_eq!(stored.key.as_deref(), Some("docs/q3.pdf"));
        assert_eq!(
            stored.location.as_deref(),
            Some("https://bucket.example.com/docs/q3.pdf")
        );
        assert_eq!(stored.status, 204);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_rejected_carries_error_body() {
        let mut server = mockito::Server::new_async().await;
        let body = "<Error><Code>AccessDenied</Code><Message>Invalid according to Policy</Message></Error>";
        server
            .mock("POST", "/")
            .with_status(403)
            .with_body(body)
            .create_async()
            .await;

        let uploader = DirectUploader::new(Client::new());
        let file = SelectedFile::new("q3.pdf", b"%PDF".to_vec());
        let err = uploader
            .upload(full_descriptor(&format!("{}/", server.url())), &file)
            .await
            .unwrap_err();

        match err {
            UploadError::UploadRejected { status, body: text } => {
                assert_eq!(status, Some(403));
                assert!(text.contains("AccessDenied"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
