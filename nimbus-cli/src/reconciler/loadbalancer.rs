//! Load balancer reconciliation profile.

use nimbus_api::{ResourceKind, ResourceState};

use super::KindProfile;

/// Load balancers converge on the activation flag alone; there is no
/// secondary readiness signal.
pub struct LoadBalancerProfile;

impl KindProfile for LoadBalancerProfile {
    fn kind(&self) -> ResourceKind {
        ResourceKind::LoadBalancer
    }

    fn is_ready(&self, _state: &ResourceState) -> bool {
        true
    }
}
