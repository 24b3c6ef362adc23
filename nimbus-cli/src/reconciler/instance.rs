//! Instance reconciliation profile.

use nimbus_api::{ResourceKind, ResourceState};

use super::KindProfile;

/// Instances converge once running and reachable: activation alone is not
/// enough, at least one assigned address must be visible.
pub struct InstanceProfile;

impl KindProfile for InstanceProfile {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Instance
    }

    fn is_ready(&self, state: &ResourceState) -> bool {
        !state.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn instance(addresses: Vec<String>) -> ResourceState {
        ResourceState {
            uuid: "i-1".into(),
            name: "web1".into(),
            active: true,
            addresses,
            extra: Map::new(),
        }
    }

    #[test]
    fn ready_requires_an_address() {
        let profile = InstanceProfile;
        assert!(!profile.is_ready(&instance(vec![])));
        assert!(profile.is_ready(&instance(vec!["10.0.0.5".into()])));
    }
}
