use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// YAML serialization/parsing error handling utilities
///
/// Serialize data to YAML with contextual error handling
pub fn serialize_to_yaml_with_context<T: Serialize>(data: &T, data_desc: &str) -> Result<String> {
    serde_yaml::to_string(data).with_context(|| format!("Failed to serialize {data_desc} to YAML"))
}

/// Parse YAML from string with contextual error handling
pub fn parse_yaml_with_context<T: DeserializeOwned>(yaml_str: &str, data_desc: &str) -> Result<T> {
    serde_yaml::from_str(yaml_str).with_context(|| format!("Failed to parse {data_desc} from YAML"))
}

/// HTTP request error handling utilities
///
/// Parse HTTP response as JSON with contextual error handling
pub async fn parse_http_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
    api_desc: &str,
) -> Result<T> {
    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to parse {api_desc} response"))
}

/// Create HTTP client carrying the given default headers
pub fn create_http_client_with_context(
    headers: HeaderMap,
    timeout: Duration,
) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_yaml_serialization_with_context() {
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        let yaml_str = serialize_to_yaml_with_context(&data, "test data").unwrap();
        assert!(yaml_str.contains("name: test"));
        assert!(yaml_str.contains("value: 42"));

        let parsed_data: TestData = parse_yaml_with_context(&yaml_str, "test data").unwrap();
        assert_eq!(parsed_data, data);
    }

    #[test]
    fn test_parse_yaml_error_mentions_description() {
        let err = parse_yaml_with_context::<TestData>("name: [unterminated", "test data")
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse test data from YAML"));
    }

    #[test]
    fn test_create_http_client() {
        let client =
            create_http_client_with_context(HeaderMap::new(), Duration::from_secs(5)).unwrap();
        // Just test that we can create a client without error
        assert!(client.get("https://example.com").build().is_ok());
    }
}
