// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Build-time driver for `serial`: endpoint classification, per-type
//! emission plans, and Rust code generation.
//!
//! A run loads a schema and the known-types registry, computes the read and
//! write closures of every endpoint, and writes one module per endpoint.
//! The modules depend only on `serial-stream`.

pub mod config;
pub mod driver;
pub mod emit;
pub mod endpoint;
pub mod naming;
pub mod plan;

pub use config::{ConfigError, ConfigStore, ConfigUpdate, FsConfigStore, GenConfig, CONFIG_KEY};
pub use driver::{
    analyze_endpoint, generate_endpoint, load_registry, module_name, run, Analysis, FailedRoot,
    GenerateError, GenerateReport, GenerateRequest, GeneratedEndpoint,
};
pub use emit::{render_endpoint, EmitError, GENERATED_HEADER};
pub use endpoint::{EndpointError, EndpointMethod, EndpointModel, MethodShape};
pub use naming::NamingError;
pub use plan::{FieldSerializerPlan, Operations, PlanError, PlanKind, TypePlan};
