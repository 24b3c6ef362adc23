//! The remote API capability trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::resource::{CreateSpec, ResourceKind, ResourceState};

/// Remote operations the Nimbus cloud exposes per resource kind.
///
/// Reconciliation logic takes this trait as an injected value so tests can
/// substitute an in-memory stub for the HTTP binding.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Full listing of resources of one kind, in whatever order the remote
    /// side returns them.
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceState>>;

    /// Fetch a single resource by uuid.
    async fn get(&self, kind: ResourceKind, uuid: &str) -> Result<ResourceState>;

    /// Create a resource from kind-specific parameters.
    async fn create(&self, kind: ResourceKind, spec: &CreateSpec) -> Result<ResourceState>;

    /// Request an activation transition (start/stop, enable/disable). The
    /// remote side acknowledges acceptance; convergence is observed via
    /// [`CloudApi::get`].
    async fn set_active(&self, kind: ResourceKind, uuid: &str, active: bool) -> Result<()>;

    /// Request deletion. Acknowledgement only, no completion signal.
    async fn delete(&self, kind: ResourceKind, uuid: &str) -> Result<()>;
}
