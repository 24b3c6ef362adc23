//! Typed resource model for the Nimbus cloud API.
//!
//! Remote resources carry a small typed core (uuid, name, activation flag,
//! addresses) plus an open attribute map for everything else the remote
//! side reports. The typed core is what reconciliation logic branches on;
//! the open map is surfaced to callers untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Instance,
    #[serde(rename = "loadbalancer")]
    LoadBalancer,
}

impl ResourceKind {
    /// REST collection path segment for this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "instances",
            ResourceKind::LoadBalancer => "loadbalancers",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Instance => write!(f, "instance"),
            ResourceKind::LoadBalancer => write!(f, "load balancer"),
        }
    }
}

/// How a resource is addressed for lookup.
///
/// At least one of the fields must be populated. A uuid is authoritative;
/// a name is a best-effort convenience only honored when the caller asserts
/// name uniqueness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub uuid: Option<String>,
    pub name: Option<String>,
}

impl Identity {
    pub fn is_empty(&self) -> bool {
        self.uuid.is_none() && self.name.is_none()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.uuid, &self.name) {
            (Some(uuid), _) => write!(f, "{}", uuid),
            (None, Some(name)) => write!(f, "{}", name),
            (None, None) => write!(f, "<unspecified>"),
        }
    }
}

/// Target state a resource should be driven toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    /// Resource exists and is activated (instance running, balancer enabled).
    Present,
    /// Resource is gone.
    Absent,
}

/// Snapshot of a remote resource.
///
/// Refreshed wholesale from the remote API; nothing here is authoritative
/// between refreshes except the optimistic `active` flip applied locally
/// right after a transition call is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub uuid: String,
    pub name: String,
    /// Normalized activation flag (instance "running", balancer "enabled").
    pub active: bool,
    /// Assigned network addresses, if the remote side reports any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    /// Remaining remote-supplied attributes, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A load balancer backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    pub ip: String,
    pub port: u16,
    pub weight: u16,
}

impl FromStr for Backend {
    type Err = String;

    /// Parses `ip:port` or `ip:port:weight` (weight defaults to 1).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let ip = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| format!("invalid backend '{}': missing ip", s))?;
        let port = parts
            .next()
            .ok_or_else(|| format!("invalid backend '{}': missing port", s))?
            .parse::<u16>()
            .map_err(|e| format!("invalid backend '{}': bad port: {}", s, e))?;
        let weight = match parts.next() {
            Some(w) => w
                .parse::<u16>()
                .map_err(|e| format!("invalid backend '{}': bad weight: {}", s, e))?,
            None => 1,
        };
        if parts.next().is_some() {
            return Err(format!("invalid backend '{}': too many fields", s));
        }
        Ok(Backend {
            ip: ip.to_string(),
            port,
            weight,
        })
    }
}

/// Load balancer frontend protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Tcp,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "tcp" => Ok(Protocol::Tcp),
            _ => Err(format!("unknown protocol '{}' (http, https, tcp)", s)),
        }
    }
}

/// Creation parameters for an instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub networks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
}

/// Creation parameters for a load balancer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadBalancerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub backends: Vec<Backend>,
    pub domains: Vec<String>,
}

/// Kind-specific creation parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CreateSpec {
    Instance(InstanceSpec),
    LoadBalancer(LoadBalancerSpec),
}

impl CreateSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            CreateSpec::Instance(_) => ResourceKind::Instance,
            CreateSpec::LoadBalancer(_) => ResourceKind::LoadBalancer,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            CreateSpec::Instance(s) => s.name.as_deref(),
            CreateSpec::LoadBalancer(s) => s.name.as_deref(),
        }
    }

    /// First creation parameter that is required but missing, if any.
    pub fn missing_for_create(&self) -> Option<&'static str> {
        match self {
            CreateSpec::Instance(s) => {
                if s.name.is_none() {
                    Some("name")
                } else if s.size.is_none() {
                    Some("size")
                } else if s.image.is_none() {
                    Some("image")
                } else {
                    None
                }
            }
            CreateSpec::LoadBalancer(s) => {
                if s.name.is_none() {
                    Some("name")
                } else if s.protocol.is_none() {
                    Some("protocol")
                } else if s.port.is_none() {
                    Some("port")
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_with_and_without_weight() {
        let b: Backend = "10.0.0.5:8080".parse().unwrap();
        assert_eq!(b.ip, "10.0.0.5");
        assert_eq!(b.port, 8080);
        assert_eq!(b.weight, 1);

        let b: Backend = "10.0.0.6:80:7".parse().unwrap();
        assert_eq!(b.weight, 7);
    }

    #[test]
    fn backend_rejects_malformed_input() {
        assert!("".parse::<Backend>().is_err());
        assert!("10.0.0.5".parse::<Backend>().is_err());
        assert!("10.0.0.5:notaport".parse::<Backend>().is_err());
        assert!("10.0.0.5:80:1:extra".parse::<Backend>().is_err());
    }

    #[test]
    fn identity_prefers_uuid_in_display() {
        let id = Identity {
            uuid: Some("abc-123".into()),
            name: Some("web1".into()),
        };
        assert_eq!(id.to_string(), "abc-123");

        let id = Identity {
            uuid: None,
            name: Some("web1".into()),
        };
        assert_eq!(id.to_string(), "web1");
    }

    #[test]
    fn missing_create_params_are_reported_in_order() {
        let spec = CreateSpec::Instance(InstanceSpec::default());
        assert_eq!(spec.missing_for_create(), Some("name"));

        let spec = CreateSpec::Instance(InstanceSpec {
            name: Some("web1".into()),
            ..Default::default()
        });
        assert_eq!(spec.missing_for_create(), Some("size"));

        let spec = CreateSpec::Instance(InstanceSpec {
            name: Some("web1".into()),
            size: Some("1gb".into()),
            image: Some("debian-12".into()),
            ..Default::default()
        });
        assert_eq!(spec.missing_for_create(), None);
    }

    #[test]
    fn resource_state_serializes_flat() {
        let mut extra = Map::new();
        extra.insert("state".into(), Value::from("running"));
        let state = ResourceState {
            uuid: "abc".into(),
            name: "web1".into(),
            active: true,
            addresses: vec!["10.0.0.5".into()],
            extra,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["uuid"], "abc");
        assert_eq!(json["state"], "running");
        assert_eq!(json["addresses"][0], "10.0.0.5");
    }
}
