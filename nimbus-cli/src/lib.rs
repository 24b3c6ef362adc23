//! Library surface of the Nimbus CLI.
//!
//! The binary is a thin argument layer over [`reconciler::Reconciler`],
//! which drives a remote resource toward a desired state through an
//! injected [`nimbus_api::CloudApi`] client.

pub mod config;
pub mod reconciler;
