//! Client library for the Nimbus cloud resource API.
//!
//! Exposes a typed resource model, the [`CloudApi`] trait describing the
//! remote operations, and [`HttpCloudApi`], a thin REST binding. Consumers
//! that drive resources toward a desired state should depend on the trait so
//! a stub client can be injected in tests.

pub mod client;
pub mod error;
pub mod http;
pub mod resource;

pub use client::CloudApi;
pub use error::ApiError;
pub use http::HttpCloudApi;
pub use resource::{
    Backend, CreateSpec, DesiredState, Identity, InstanceSpec, LoadBalancerSpec, Protocol,
    ResourceKind, ResourceState,
};
