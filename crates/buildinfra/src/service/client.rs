use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{ProfileService, PROFILE_PATH};
use crate::errors::{InfraError, InfraResult};
use crate::models::profile::{DEFAULT_PROFILE_NAME, LIST_SEGMENT};
use crate::payload::{ApiResponse, ProfileListResponse, ProfilePayload, ProfileResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    /// Sent as the `token` header when present.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self {
            host: host.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct InfraConfigClient {
    client: Client,
    config: ClientConfig,
}

impl InfraConfigClient {
    pub fn new(config: ClientConfig) -> InfraResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    fn url(&self, name: Option<&str>) -> InfraResult<Url> {
        let mut url = Url::parse(&self.config.host)?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidInput(format!("{} cannot be used as a host", self.config.host))
            })?;
            segments.pop_if_empty();
            segments.extend(PROFILE_PATH.split('/'));
            if let Some(name) = name {
                segments.push(name);
            }
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> InfraResult<Option<T>> {
        let request = match &self.config.token {
            Some(token) => request.header("token", token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "infra-config response");

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(None);
            }
            let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
            return Ok(envelope.result);
        }

        let message = serde_json::from_str::<ApiResponse<Value>>(&body)
            .ok()
            .and_then(|envelope| envelope.errors.iter().find_map(|error| error.message()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        Err(InfraError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn not_found_as(name: &str, error: InfraError) -> InfraError {
    match error {
        InfraError::Api { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            InfraError::NotFound(name.to_string())
        }
        other => other,
    }
}

#[async_trait]
impl ProfileService for InfraConfigClient {
    async fn get_profile(&self, name: Option<&str>) -> InfraResult<ProfileResponse> {
        let name = name.unwrap_or(DEFAULT_PROFILE_NAME);
        let url = self.url(Some(name))?;
        debug!(%url, "fetching profile");

        self.send(self.client.get(url))
            .await
            .map_err(|e| not_found_as(name, e))?
            .ok_or(InfraError::EmptyResult)
    }

    async fn create_profile(&self, payload: &ProfilePayload) -> InfraResult<()> {
        let url = self.url(None)?;
        debug!(%url, name = %payload.name, "creating profile");

        self.send::<Value>(self.client.post(url).json(payload))
            .await?;
        Ok(())
    }

    async fn update_profile(&self, name: &str, payload: &ProfilePayload) -> InfraResult<()> {
        let url = self.url(Some(name))?;
        debug!(%url, "updating profile");

        self.send::<Value>(self.client.put(url).json(payload))
            .await
            .map_err(|e| not_found_as(name, e))?;
        Ok(())
    }

    async fn list_profiles(&self) -> InfraResult<ProfileListResponse> {
        let url = self.url(Some(LIST_SEGMENT))?;
        debug!(%url, "listing profiles");

        self.send(self.client.get(url))
            .await?
            .ok_or(InfraError::EmptyResult)
    }

    async fn delete_profile(&self, name: &str) -> InfraResult<()> {
        let url = self.url(Some(name))?;
        debug!(%url, "deleting profile");

        self.send::<Value>(self.client.delete(url))
            .await
            .map_err(|e| not_found_as(name, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_client(server: &MockServer, token: Option<&str>) -> InfraConfigClient {
        let config = ClientConfig {
            host: server.uri(),
            token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
        };
        InfraConfigClient::new(config).unwrap()
    }

    fn payload() -> ProfilePayload {
        serde_json::from_value(json!({
            "name": "large",
            "description": "for heavy builds",
            "type": "NORMAL",
            "configurations": {
                "default": [{"key": "cpu_limit", "value": 2, "unit": "Core", "active": true}]
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_profile_sends_token() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orchestrator/infra-config/profile/large"))
            .and(header("token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "status": "OK",
                "result": {
                    "defaultConfigurations": {
                        "default": [{"id": 1, "key": "cpu_limit", "value": 1, "unit": "Core", "active": true}]
                    },
                    "configurationUnits": {},
                    "profile": {"id": 4, "name": "large", "type": "NORMAL", "configurations": {}}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server, Some("secret")).await;
        let response = client.get_profile(Some("large")).await?;

        assert_eq!(response.profile.unwrap().id, Some(4));
        assert_eq!(response.default_configurations["default"].len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_profile_defaults_to_default_profile() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orchestrator/infra-config/profile/default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "status": "OK",
                "result": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server, None).await;
        let response = client.get_profile(None).await?;
        assert!(response.profile.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orchestrator/infra-config/profile/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = setup_client(&server, None).await;
        let error = client.get_profile(Some("ghost")).await.unwrap_err();
        assert!(matches!(error, InfraError::NotFound(ref name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_create_posts_payload() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orchestrator/infra-config/profile"))
            .and(body_json(serde_json::to_value(payload())?))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "status": "OK",
                "result": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server, None).await;
        client.create_profile(&payload()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_update_puts_to_current_name() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/orchestrator/infra-config/profile/medium"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server, None).await;
        client.update_profile("medium", &payload()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_api_error_uses_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orchestrator/infra-config/profile"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": 409,
                "status": "Conflict",
                "errors": [{"internalMessage": "duplicate key", "userMessage": "profile large already exists"}]
            })))
            .mount(&server)
            .await;

        let client = setup_client(&server, None).await;
        let error = client.create_profile(&payload()).await.unwrap_err();
        match error {
            InfraError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "profile large already exists");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orchestrator/infra-config/profile/list"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = setup_client(&server, None).await;
        let error = client.list_profiles().await.unwrap_err();
        assert_eq!(error.user_message(), "Service Unavailable");
    }

    #[tokio::test]
    async fn test_list_and_delete() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orchestrator/infra-config/profile/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "status": "OK",
                "result": {
                    "defaultProfile": {"name": "default", "type": "DEFAULT"},
                    "profiles": [{"name": "large", "appCount": 2}],
                    "configurationUnits": {}
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/orchestrator/infra-config/profile/large"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server, None).await;
        let list = client.list_profiles().await?;
        assert_eq!(list.profiles[0].app_count, Some(2));
        assert_eq!(list.default_profile.unwrap().name, "default");

        client.delete_profile("large").await?;
        Ok(())
    }

    #[test]
    fn test_url_keeps_host_path_and_encodes_name() {
        let client = InfraConfigClient::new(ClientConfig::new("https://ci.example.com/devtron/")).unwrap();
        let url = client.url(Some("my profile")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://ci.example.com/devtron/orchestrator/infra-config/profile/my%20profile"
        );
    }
}
