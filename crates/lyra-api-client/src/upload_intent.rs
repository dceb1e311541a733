//! Upload intent: exchange document metadata for a presigned POST descriptor.

use lyra_core::{DocumentUploadRequest, UploadDescriptor, UploadError, UploadIntentBody};
use serde_json::Value;

use crate::ApiClient;

/// Wrapper fields the backend may nest its payload under.
const WRAPPER_FIELDS: [&str; 2] = ["body", "data"];

/// Stringified and wrapped layers are peeled at most this many times.
const MAX_UNWRAP_DEPTH: usize = 4;

impl ApiClient {
    /// Ask the backend for a single-use upload descriptor for `request`.
    ///
    /// An absent department is replaced by the client's default department.
    pub async fn request_upload_intent(
        &self,
        request: &DocumentUploadRequest,
        token: &str,
    ) -> Result<UploadDescriptor, UploadError> {
        let body = UploadIntentBody::from_request(request, self.default_department());
        tracing::debug!(
            title = %body.title,
            department = %body.department,
            tags = ?body.tags,
            visibility = %body.visibility,
            "Requesting upload intent"
        );

        let response: Value = self
            .post_json(&self.upload_intent_path, &body, token)
            .await?;

        unwrap_intent_response(response)
    }
}

/// Normalize the intent response into a descriptor.
///
/// The payload may arrive as a raw object, nested under a wrapper field, or as
/// a JSON-encoded string (possibly combined, e.g. a wrapper whose `body` is a
/// string). Each layer is peeled until an object carrying `upload_data` is found.
pub fn unwrap_intent_response(value: Value) -> Result<UploadDescriptor, UploadError> {
    let mut current = value;

    for _ in 0..MAX_UNWRAP_DEPTH {
        current = match current {
            Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
                UploadError::MalformedResponse(format!("Response string is not JSON: {}", e))
            })?,
            Value::Object(mut map) if !map.contains_key("upload_data") => {
                match WRAPPER_FIELDS.iter().find_map(|field| map.remove(*field)) {
                    Some(inner) => inner,
                    None => {
                        return Err(UploadError::MalformedResponse(
                            "Response is missing upload_data".to_string(),
                        ))
                    }
                }
            }
            other => return extract_descriptor(other),
        };
    }

    Err(UploadError::MalformedResponse(
        "Response is nested too deeply".to_string(),
    ))
}

fn extract_descriptor(value: Value) -> Result<UploadDescriptor, UploadError> {
    let presigned = value
        .get("upload_data")
        .and_then(|data| data.get("presigned_url"))
        .filter(|p| p.is_object())
        .cloned()
        .ok_or_else(|| {
            UploadError::MalformedResponse(
                "Response is missing upload_data.presigned_url".to_string(),
            )
        })?;

    serde_json::from_value(presigned).map_err(|e| {
        UploadError::MalformedResponse(format!("Invalid presigned_url descriptor: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::{Department, SelectedFile, Visibility};
    use mockito::Matcher;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "upload_data": {
                "presigned_url": {
                    "url": "https://bucket.s3.amazonaws.com/",
                    "fields": { "key": "docs/q3.pdf", "policy": "p" }
                }
            }
        })
    }

    #[test]
    fn test_unwrap_raw_object() {
        let descriptor = unwrap_intent_response(payload()).unwrap();
        assert_eq!(descriptor.url, "https://bucket.s3.amazonaws.com/");
        assert_eq!(descriptor.object_key(), Some("docs/q3.pdf"));
    }

    #[test]
    fn test_unwrap_wrapped_object() {
        let descriptor = unwrap_intent_response(json!({ "statusCode": 200, "body": payload() }))
            .unwrap();
        assert_eq!(descriptor.object_key(), Some("docs/q3.pdf"));
    }

    #[test]
    fn test_unwrap_data_wrapper() {
        let descriptor = unwrap_intent_response(json!({ "data": payload() })).unwrap();
        assert_eq!(descriptor.url, "https://bucket.s3.amazonaws.com/");
        assert_eq!(descriptor.field("policy"), Some("p"));
    }

    #[test]
    fn test_unwrap_too_deep() {
        let mut nested = payload();
        for _ in 0..5 {
            nested = json!({ "body": nested });
        }

        match unwrap_intent_response(nested) {
            Err(UploadError::MalformedResponse(reason)) => {
                assert_eq!(reason, "Response is nested too deeply")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unwrap_stringified() {
        let descriptor = unwrap_intent_response(Value::String(payload().to_string())).unwrap();
        assert_eq!(descriptor.object_key(), Some("docs/q3.pdf"));

        // Wrapper whose body is itself a JSON string.
        let wrapped = json!({ "statusCode": 200, "body": payload().to_string() });
        let descriptor = unwrap_intent_response(wrapped).unwrap();
        assert_eq!(descriptor.field("policy"), Some("p"));
    }

    #[test]
    fn test_unwrap_preserves_field_order() {
        let descriptor = unwrap_intent_response(Value::String(
            r#"{"upload_data":{"presigned_url":{"url":"u","fields":{"z":"1","a":"2","m":"3"}}}}"#
                .to_string(),
        ))
        .unwrap();
        let names: Vec<&str> = descriptor.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_unwrap_malformed() {
        for value in [
            json!({ "message": "ok" }),
            json!({ "upload_data": {} }),
            json!({ "upload_data": { "presigned_url": "https://not-an-object" } }),
            json!({ "upload_data": { "presigned_url": { "fields": {} } } }),
            Value::String("not json".to_string()),
            json!([1, 2, 3]),
        ] {
            assert!(
                matches!(
                    unwrap_intent_response(value.clone()),
                    Err(UploadError::MalformedResponse(_))
                ),
                "expected malformed for {}",
                value
            );
        }
    }

    fn q3_request() -> DocumentUploadRequest {
        let file = SelectedFile::new("q3.pdf", b"%PDF".to_vec());
        DocumentUploadRequest::from_form("Q3 Report", None, "finance, q3", Visibility::TeamOnly, &file)
    }

    #[tokio::test]
    async fn test_request_upload_intent_sends_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/documents/upload")
            .match_header("authorization", "Bearer id-token")
            .match_body(Matcher::Json(json!({
                "title": "Q3 Report",
                "department": "engineering",
                "tags": ["finance", "q3"],
                "visibility": "team-only",
                "file_extension": "pdf",
                "content_type": "application/pdf",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(payload().to_string())
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let descriptor = client
            .request_upload_intent(&q3_request(), "id-token")
            .await
            .unwrap();
        assert_eq!(descriptor.object_key(), Some("docs/q3.pdf"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_upload_intent_uses_configured_default_department() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/upload")
            .match_body(Matcher::PartialJson(json!({ "department": "legal" })))
            .with_status(200)
            .with_body(payload().to_string())
            .create_async()
            .await;

        let config = lyra_core::ClientConfig::from_vars(|key| match key {
            "LYRA_API_URL" => Some(server.url()),
            "LYRA_UPLOAD_INTENT_PATH" => Some("/v1/upload".to_string()),
            "LYRA_DEFAULT_DEPARTMENT" => Some("legal".to_string()),
            "COGNITO_CLIENT_ID" => Some("client".to_string()),
            _ => None,
        })
        .unwrap();
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.default_department(), Department::Legal);

        client
            .request_upload_intent(&q3_request(), "id-token")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_upload_intent_backend_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/documents/upload")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let err = client
            .request_upload_intent(&q3_request(), "id-token")
            .await
            .unwrap_err();
        match err {
            UploadError::Backend { status, body } => {
                assert_eq!(status, Some(403));
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_upload_intent_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/documents/upload")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let err = client
            .request_upload_intent(&q3_request(), "id-token")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MalformedResponse(_)));
    }
}
