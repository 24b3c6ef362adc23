//! REST binding for the Nimbus cloud API.

use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::client::CloudApi;
use crate::error::{ApiError, Result};
use crate::resource::{CreateSpec, ResourceKind, ResourceState};

/// HTTP client for the Nimbus cloud API.
///
/// Credentials are sent as basic auth on every request. All responses are
/// JSON; resource payloads are normalized into [`ResourceState`] with the
/// kind-specific activation field folded into the `active` flag.
pub struct HttpCloudApi {
    http: reqwest::Client,
    base: String,
    key: String,
    secret: String,
}

impl HttpCloudApi {
    pub fn new(base: impl Into<String>, key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            key: key.into(),
            secret: secret.into(),
        }
    }

    fn collection_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}", self.base, kind.collection())
    }

    fn resource_url(&self, kind: ResourceKind, uuid: &str) -> String {
        format!("{}/{}/{}", self.base, kind.collection(), uuid)
    }

    /// Maps a non-success response to an error, reading the body as the
    /// remote-supplied message.
    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ApiError::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait::async_trait]
impl CloudApi for HttpCloudApi {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceState>> {
        debug!(%kind, "Listing resources");
        let resp = self
            .http
            .get(self.collection_url(kind))
            .basic_auth(&self.key, Some(&self.secret))
            .send()
            .await?;
        let body: Value = Self::check(resp).await?.json().await?;
        let items = body
            .as_array()
            .ok_or_else(|| ApiError::Decode("listing is not an array".to_string()))?;
        items
            .iter()
            .map(|item| decode_state(kind, item))
            .collect()
    }

    async fn get(&self, kind: ResourceKind, uuid: &str) -> Result<ResourceState> {
        debug!(%kind, uuid, "Fetching resource");
        let resp = self
            .http
            .get(self.resource_url(kind, uuid))
            .basic_auth(&self.key, Some(&self.secret))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                kind,
                uuid: uuid.to_string(),
            });
        }
        let body: Value = Self::check(resp).await?.json().await?;
        decode_state(kind, &body)
    }

    async fn create(&self, kind: ResourceKind, spec: &CreateSpec) -> Result<ResourceState> {
        debug!(%kind, name = spec.name(), "Creating resource");
        let resp = self
            .http
            .post(self.collection_url(kind))
            .basic_auth(&self.key, Some(&self.secret))
            .json(spec)
            .send()
            .await?;
        let body: Value = Self::check(resp).await?.json().await?;
        decode_state(kind, &body)
    }

    async fn set_active(&self, kind: ResourceKind, uuid: &str, active: bool) -> Result<()> {
        debug!(%kind, uuid, active, "Requesting activation transition");
        let resp = self
            .http
            .put(format!("{}/active", self.resource_url(kind, uuid)))
            .basic_auth(&self.key, Some(&self.secret))
            .json(&serde_json::json!({ "active": active }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, uuid: &str) -> Result<()> {
        debug!(%kind, uuid, "Deleting resource");
        let resp = self
            .http
            .delete(self.resource_url(kind, uuid))
            .basic_auth(&self.key, Some(&self.secret))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Normalizes a wire payload into the typed core plus open attributes.
///
/// Instances report a `state` string ("running" means active) and an
/// `interfaces` array; load balancers report an `enabled` boolean and a
/// single `address`.
fn decode_state(kind: ResourceKind, value: &Value) -> Result<ResourceState> {
    let obj = value
        .as_object()
        .ok_or_else(|| ApiError::Decode("resource is not an object".to_string()))?;
    let uuid = obj
        .get("uuid")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Decode("resource missing uuid".to_string()))?
        .to_string();
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Decode(format!("resource {} missing name", uuid)))?
        .to_string();

    let (active, addresses) = match kind {
        ResourceKind::Instance => {
            let active = obj.get("state").and_then(Value::as_str) == Some("running");
            let addresses = obj
                .get("interfaces")
                .and_then(Value::as_array)
                .map(|ifaces| {
                    ifaces
                        .iter()
                        .filter_map(|i| i.get("ip").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            (active, addresses)
        }
        ResourceKind::LoadBalancer => {
            let active = obj.get("enabled").and_then(Value::as_bool).unwrap_or(false);
            let addresses = obj
                .get("address")
                .and_then(Value::as_str)
                .map(|a| vec![a.to_string()])
                .unwrap_or_default();
            (active, addresses)
        }
    };

    let mut extra = obj.clone();
    extra.remove("uuid");
    extra.remove("name");

    Ok(ResourceState {
        uuid,
        name,
        active,
        addresses,
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_running_instance() {
        let payload = json!({
            "uuid": "i-1",
            "name": "web1",
            "state": "running",
            "interfaces": [{"ip": "10.0.0.5", "network": "net-a"}],
            "size": "1gb"
        });
        let state = decode_state(ResourceKind::Instance, &payload).unwrap();
        assert!(state.active);
        assert_eq!(state.addresses, vec!["10.0.0.5"]);
        assert_eq!(state.extra["size"], "1gb");
        assert!(!state.extra.contains_key("uuid"));
    }

    #[test]
    fn decodes_stopped_instance_without_interfaces() {
        let payload = json!({
            "uuid": "i-2",
            "name": "web2",
            "state": "stopped"
        });
        let state = decode_state(ResourceKind::Instance, &payload).unwrap();
        assert!(!state.active);
        assert!(state.addresses.is_empty());
    }

    #[test]
    fn decodes_load_balancer() {
        let payload = json!({
            "uuid": "lb-1",
            "name": "edge",
            "enabled": true,
            "address": "198.51.100.7",
            "port": 80
        });
        let state = decode_state(ResourceKind::LoadBalancer, &payload).unwrap();
        assert!(state.active);
        assert_eq!(state.addresses, vec!["198.51.100.7"]);
        assert_eq!(state.extra["port"], 80);
    }

    #[test]
    fn rejects_payload_without_uuid() {
        let payload = json!({"name": "web1", "state": "running"});
        let err = decode_state(ResourceKind::Instance, &payload).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
