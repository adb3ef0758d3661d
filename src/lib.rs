//! # fedpipe
//!
//! A type-safe pipeline builder and job client for multi-party federated
//! computation workflows.
//!
//! ## Features
//!
//! - **Explicit graphs**: components and wires are addressable values owned
//!   by the pipeline, not side effects of call order
//! - **Per-party parameterization**: one logical stage, different behavior
//!   per organization through a two-tier defaults/overrides model
//! - **Deterministic compilation**: the same graph always compiles to
//!   byte-identical configuration and DAG documents
//! - **Pluggable backends**: an in-memory standalone backend ships by
//!   default; an HTTP coordinator client is feature-gated
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fedpipe::prelude::*;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), fedpipe::PipelineError> {
//! let stages = StageRegistry::builtin();
//! let mut pipeline = Pipeline::new();
//! pipeline.set_initiator(Role::Guest, 9999)?;
//! pipeline.set_roles(BTreeMap::from([
//!     (Role::Guest, vec![9999]),
//!     (Role::Host, vec![10000]),
//! ]))?;
//!
//! let reader = Component::new("reader_0", stages.get("reader")?);
//! let reader_out = reader.output("data")?;
//! pipeline.add_component(reader, Inputs::new())?;
//! pipeline.add_component(
//!     Component::new("dataio_0", stages.get("data_io")?),
//!     Inputs::new().data(reader_out),
//! )?;
//!
//! let submitter = JobSubmitter::new(Arc::new(LocalBackend::new()));
//! let handle = pipeline
//!     .fit(&submitter, ComputeBackend::Eggroll, WorkMode::Standalone)
//!     .await?;
//! println!("{:?}", handle.summary("dataio_0")?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`Pipeline`] and friends: building and compiling the workflow graph
//! - [`backend`]: the execution backend boundary and its implementations
//! - [`job`]: submission and asynchronous job tracking
//! - [`prelude`]: commonly used types (import with `use fedpipe::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

pub mod backend;
pub mod job;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use core::ParamValue;
pub use core::compile::{CompiledJob, ComponentConf, JobConf, JobDsl, TaskSpec};
pub use core::component::{Component, DatasetRef, OutputRef};
pub use core::error::PipelineError;
pub use core::party::{Party, PartyId, Role, RoleRegistry};
pub use core::pipeline::{Inputs, Pipeline, Wire, WireKind};
pub use core::stage::{SlotSpec, StageRegistry, StageSpec};

pub use backend::{ComputeBackend, ExecutionBackend, RuntimeConf, WorkMode};
pub use backend::local::LocalBackend;
pub use job::{JobHandle, JobStatus, JobSubmitter, Summary};

#[cfg(feature = "http")]
pub use backend::http::{HttpBackend, HttpBackendConfig};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// The main prelude: everything needed to build, compile, and submit a
/// pipeline.
///
/// # Example
/// ```rust
/// use fedpipe::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        CompiledJob,
        Component,
        ComputeBackend,
        DatasetRef,
        ExecutionBackend,
        Inputs,
        JobHandle,
        JobStatus,
        JobSubmitter,
        LocalBackend,
        OutputRef,
        ParamValue,
        Party,
        PartyId,
        Pipeline,
        PipelineError,
        Role,
        RuntimeConf,
        StageRegistry,
        StageSpec,
        Summary,
        WorkMode,
    };

    #[cfg(feature = "http")]
    pub use super::HttpBackend;
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
