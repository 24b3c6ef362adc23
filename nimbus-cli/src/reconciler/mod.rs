//! Reconciliation of desired state against the remote API.
//!
//! One generic routine compares the desired state with what the remote side
//! reports and takes actions to converge: look up, create if missing,
//! transition activation, then optionally poll until the resource is both
//! active and ready. Kind-specific behavior is confined to a small
//! [`KindProfile`] descriptor.

pub mod instance;
pub mod loadbalancer;

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use nimbus_api::{
    ApiError, CloudApi, CreateSpec, DesiredState, Identity, ResourceKind, ResourceState,
};

use instance::InstanceProfile;
use loadbalancer::LoadBalancerProfile;

/// Fixed interval between convergence polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Default bound on the wait loop.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors surfaced by [`Reconciler::apply`].
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Required parameter or credential missing; raised before the remote
    /// call that would have needed it.
    #[error("configuration error: {0}")]
    Config(String),

    /// Remote failure, propagated verbatim and never retried.
    #[error(transparent)]
    Remote(#[from] ApiError),

    /// Resource vanished between a mutation and a convergence poll.
    #[error("resource {0} disappeared while waiting for convergence")]
    NotFound(Identity),

    /// The wait loop exhausted its deadline.
    #[error("timed out waiting for {identity} to converge")]
    Timeout { identity: Identity },
}

/// Knobs supplied by the caller alongside the desired state.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Honor name-based lookup (names are not guaranteed unique remotely).
    pub unique_name: bool,
    /// Block until the resource converges.
    pub wait: bool,
    /// Bound on the wait loop.
    pub wait_timeout: Duration,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            unique_name: false,
            wait: false,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    /// Whether a creation, activation transition, or deletion was issued.
    pub changed: bool,
    /// Final resource snapshot; `None` only when deletion found nothing.
    #[serde(rename = "resource")]
    pub state: Option<ResourceState>,
}

/// Kind-specific reconciliation behavior.
pub trait KindProfile: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Secondary readiness signal required beyond the activation flag.
    fn is_ready(&self, state: &ResourceState) -> bool;
}

fn profile_for(kind: ResourceKind) -> &'static dyn KindProfile {
    match kind {
        ResourceKind::Instance => &InstanceProfile,
        ResourceKind::LoadBalancer => &LoadBalancerProfile,
    }
}

/// Drives one remote resource toward a desired state.
///
/// Holds a borrowed client so callers (and tests) decide what sits behind
/// the [`CloudApi`] seam. One `apply` call owns its state snapshot for its
/// whole duration; nothing is shared across invocations and no locking is
/// performed, so concurrent callers racing on the same identity can end up
/// creating duplicates.
pub struct Reconciler<'a> {
    api: &'a dyn CloudApi,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a dyn CloudApi) -> Self {
        Self { api }
    }

    /// Converges the resource addressed by `identity` toward `desired`.
    ///
    /// Deleting an absent resource is idempotent success (`changed = false`,
    /// no state) for both kinds. Remote errors propagate immediately; only
    /// the wait loop polls, at a fixed interval bounded by
    /// `options.wait_timeout`.
    pub async fn apply(
        &self,
        kind: ResourceKind,
        identity: &Identity,
        desired: DesiredState,
        spec: Option<&CreateSpec>,
        options: &ApplyOptions,
    ) -> Result<ApplyOutcome, ApplyError> {
        if identity.is_empty() {
            return Err(ApplyError::Config(
                "either uuid or name is required".to_string(),
            ));
        }
        let profile = profile_for(kind);
        match desired {
            DesiredState::Present => self.ensure_present(profile, identity, spec, options).await,
            DesiredState::Absent => self.ensure_absent(profile, identity, options).await,
        }
    }

    /// Two passes over the full listing: uuid equality first, then (only
    /// when the caller asserts unique names) name equality. First match in
    /// listing order wins; selection among duplicate names is undefined.
    async fn lookup(
        &self,
        kind: ResourceKind,
        identity: &Identity,
        unique_name: bool,
    ) -> Result<Option<ResourceState>, ApplyError> {
        let listing = self.api.list(kind).await?;
        if let Some(uuid) = &identity.uuid {
            if let Some(found) = listing.iter().find(|r| &r.uuid == uuid) {
                return Ok(Some(found.clone()));
            }
        }
        if unique_name {
            if let Some(name) = &identity.name {
                if let Some(found) = listing.iter().find(|r| &r.name == name) {
                    return Ok(Some(found.clone()));
                }
            }
        }
        Ok(None)
    }

    async fn ensure_present(
        &self,
        profile: &dyn KindProfile,
        identity: &Identity,
        spec: Option<&CreateSpec>,
        options: &ApplyOptions,
    ) -> Result<ApplyOutcome, ApplyError> {
        let kind = profile.kind();
        let mut changed = false;

        let mut state = match self.lookup(kind, identity, options.unique_name).await? {
            Some(state) => state,
            None => {
                let spec = spec.ok_or_else(|| {
                    ApplyError::Config(format!("creation parameters required to create {}", kind))
                })?;
                if spec.kind() != kind {
                    return Err(ApplyError::Config(format!(
                        "creation parameters are for a {}, not a {}",
                        spec.kind(),
                        kind
                    )));
                }
                if let Some(missing) = spec.missing_for_create() {
                    return Err(ApplyError::Config(format!(
                        "{} is required to create a {}",
                        missing, kind
                    )));
                }
                info!(%kind, name = spec.name(), "Creating resource");
                changed = true;
                self.api.create(kind, spec).await?
            }
        };

        // `state` is an actual observation at this point; remember the
        // observed activation flag before the optimistic flip below.
        let observed_active = state.active;
        if !observed_active {
            info!(%kind, uuid = %state.uuid, "Activating resource");
            self.api.set_active(kind, &state.uuid, true).await?;
            state.active = true;
            changed = true;
        } else {
            debug!(%kind, uuid = %state.uuid, "Already active");
        }

        if options.wait {
            let mut observed = state.clone();
            observed.active = observed_active;
            state = self
                .wait_converged(profile, observed, options.wait_timeout)
                .await?;
        }

        Ok(ApplyOutcome {
            changed,
            state: Some(state),
        })
    }

    async fn ensure_absent(
        &self,
        profile: &dyn KindProfile,
        identity: &Identity,
        options: &ApplyOptions,
    ) -> Result<ApplyOutcome, ApplyError> {
        let kind = profile.kind();
        match self.lookup(kind, identity, options.unique_name).await? {
            None => {
                debug!(%kind, %identity, "Already absent");
                Ok(ApplyOutcome {
                    changed: false,
                    state: None,
                })
            }
            Some(state) => {
                info!(%kind, uuid = %state.uuid, "Deleting resource");
                self.api.delete(kind, &state.uuid).await?;
                Ok(ApplyOutcome {
                    changed: true,
                    state: Some(state),
                })
            }
        }
    }

    /// Polls at a fixed interval until the resource is observed active and
    /// ready, or the deadline passes. Only refreshed observations count;
    /// the optimistic flip applied after a transition call never does.
    async fn wait_converged(
        &self,
        profile: &dyn KindProfile,
        mut observed: ResourceState,
        timeout: Duration,
    ) -> Result<ResourceState, ApplyError> {
        let kind = profile.kind();
        let deadline = Instant::now() + timeout;
        loop {
            if observed.active && profile.is_ready(&observed) {
                debug!(%kind, uuid = %observed.uuid, "Converged");
                return Ok(observed);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(%kind, uuid = %observed.uuid, "Timed out waiting for convergence");
                return Err(ApplyError::Timeout {
                    identity: resolved_identity(&observed),
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
            debug!(%kind, uuid = %observed.uuid, "Polling for convergence");
            observed = match self.api.get(kind, &observed.uuid).await {
                Ok(state) => state,
                Err(ApiError::NotFound { .. }) => {
                    return Err(ApplyError::NotFound(resolved_identity(&observed)));
                }
                Err(e) => return Err(e.into()),
            };
        }
    }
}

fn resolved_identity(state: &ResourceState) -> Identity {
    Identity {
        uuid: Some(state.uuid.clone()),
        name: Some(state.name.clone()),
    }
}
