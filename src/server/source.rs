use super::error::ServiceError;
use serde_json::Value;

use std::io::ErrorKind;
use std::path::Path;

/// Read the telemetry document the poller last fetched.
pub async fn read_document(path: &Path) -> Result<Value, ServiceError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ServiceError::DocumentNotFound(path.display().to_string()),
            _ => ServiceError::InvalidDocument(format!("{}: {}", path.display(), e)),
        })?;

    log::trace!("document {}: {}", path.display(), text);

    let value = serde_json::from_str(&text)
        .map_err(|e| ServiceError::InvalidDocument(format!("{}: {}", path.display(), e)))?;

    map_response_status(value)
}

/// A response whose `message` is anything but `success` carries an API error instead of
/// telemetry. Documents without a `message` are taken as they are.
fn map_response_status(value: Value) -> Result<Value, ServiceError> {
    let failed = match value.get("message") {
        None => false,
        Some(Value::String(message)) => !message.eq_ignore_ascii_case("success"),
        Some(_) => true,
    };

    if failed {
        Err(ServiceError::Upstream(value.to_string()))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    use std::path::PathBuf;

    fn resource_path(filename: &str) -> PathBuf {
        let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push(format!("resources/test/{}", filename));
        d
    }

    #[test]
    fn response_status() {
        assert!(map_response_status(json!({"message": "Success", "data": {}})).is_ok());
        assert!(map_response_status(json!({"message": "success"})).is_ok());
        assert!(map_response_status(json!({"data": {}})).is_ok());
        assert!(matches!(
            map_response_status(json!({"code": "1006", "message": "token expired"})),
            Err(ServiceError::Upstream(_))
        ));
        assert!(matches!(
            map_response_status(json!({"message": null})),
            Err(ServiceError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn read_fixture() {
        let document = read_document(&resource_path("response_single.json"))
            .await
            .unwrap();
        assert!(document["data"]["quota"].is_object());
    }

    #[tokio::test]
    async fn missing_document() {
        let result = read_document(&resource_path("no_such_response.json")).await;
        assert!(matches!(result, Err(ServiceError::DocumentNotFound(_))));
    }
}
