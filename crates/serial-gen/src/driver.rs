// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One generation run: registry lifecycle, per-endpoint analysis, output.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serial_oracle::{
    BuilderOptions, Direction, EndpointDef, RootProblem, Schema, SerializableTypeOracle,
    SerializableTypeOracleUnion, SubtypeIndex, SubtypeRegistry, TypeInfoProvider,
    TypeOracleBuilder,
};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::emit::{self, EmitError};
use crate::endpoint::{EndpointError, EndpointModel};
use crate::naming;
use crate::plan::{FieldSerializerPlan, PlanError};

/// Inputs of one [`run`].
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Schema document.
    pub schema: PathBuf,
    /// Directory receiving one `<endpoint>.rs` per endpoint.
    pub output_dir: PathBuf,
    /// Known-types registry, loaded and rewritten.
    pub known_types_file: PathBuf,
    /// Extra registries, merged but never rewritten.
    pub extra_known_types: Vec<PathBuf>,
    /// Closure options.
    pub options: BuilderOptions,
    /// Endpoints to generate; empty means all.
    pub endpoints: Vec<String>,
}

/// Why one endpoint could not be generated.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// A method has an unsupported shape.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// Some roots have no valid closure.
    #[error("{endpoint}: {} root(s) failed: {}", .failed.len(), describe(.failed))]
    Closure {
        /// Endpoint interface.
        endpoint: String,
        /// Every failing root, read direction first.
        failed: Vec<FailedRoot>,
    },

    /// The closure could not be planned.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The plan could not be emitted.
    #[error(transparent)]
    Emit(#[from] EmitError),
}

impl GenerateError {
    /// Roots that failed, if this is a closure failure.
    pub fn failed_roots(&self) -> &[FailedRoot] {
        match self {
            Self::Closure { failed, .. } => failed,
            _ => &[],
        }
    }
}

/// One root whose closure failed in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRoot {
    /// Closure the root belongs to.
    pub direction: Direction,
    /// The root and its error.
    pub problem: RootProblem,
}

impl fmt::Display for FailedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} root `{}`: {}",
            self.direction, self.problem.root, self.problem.error
        )
    }
}

fn describe(failed: &[FailedRoot]) -> String {
    let mut out = String::new();
    for (i, root) in failed.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{root}");
    }
    out
}

/// Everything computed for one endpoint before emission.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Classified methods.
    pub endpoint: EndpointModel,
    /// Read and write closures.
    pub union: SerializableTypeOracleUnion,
    /// Emission plan.
    pub plan: FieldSerializerPlan,
}

/// Generated source for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEndpoint {
    /// Endpoint interface.
    pub endpoint: String,
    /// Module (and file stem) name.
    pub module_name: String,
    /// Formatted source.
    pub code: String,
}

/// Outcome of [`run`].
#[derive(Debug, Default)]
pub struct GenerateReport {
    /// Files written.
    pub generated: Vec<PathBuf>,
    /// Endpoints that failed, with the reason.
    pub failures: Vec<(String, GenerateError)>,
    /// Registry size after the run.
    pub known_types: usize,
    /// Names the schema added to the registry.
    pub discovered: usize,
}

impl GenerateReport {
    /// Whether every requested endpoint was generated.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every failed root across all failed endpoints, with its endpoint.
    pub fn failed_roots(&self) -> impl Iterator<Item = (&str, &FailedRoot)> {
        self.failures.iter().flat_map(|(endpoint, err)| {
            err.failed_roots()
                .iter()
                .map(move |root| (endpoint.as_str(), root))
        })
    }
}

/// Module name for an endpoint: snake-cased simple name.
pub fn module_name(endpoint: &str) -> String {
    naming::snake(&naming::simple_name(endpoint))
}

fn closure(
    provider: &dyn TypeInfoProvider,
    index: &SubtypeIndex,
    model: &EndpointModel,
    direction: Direction,
    options: BuilderOptions,
    failed: &mut Vec<FailedRoot>,
) -> SerializableTypeOracle {
    let roots = match direction {
        Direction::Read => model.read_roots(),
        Direction::Write => model.write_roots(),
    };
    let mut builder = TypeOracleBuilder::new(provider, index, direction).with_options(options);
    builder.add_roots(roots);
    let build = builder.build();
    failed.extend(
        build
            .problems
            .into_iter()
            .map(|problem| FailedRoot { direction, problem }),
    );
    build.oracle
}

/// Classify, close both directions, and plan one endpoint. Both closures
/// are always computed so a failure lists every bad root at once.
pub fn analyze_endpoint(
    provider: &dyn TypeInfoProvider,
    index: &SubtypeIndex,
    def: &EndpointDef,
    options: BuilderOptions,
) -> Result<Analysis, GenerateError> {
    let endpoint = EndpointModel::classify(def)?;
    let mut failed = Vec::new();
    let read = closure(provider, index, &endpoint, Direction::Read, options, &mut failed);
    let write = closure(provider, index, &endpoint, Direction::Write, options, &mut failed);
    if !failed.is_empty() {
        for root in &failed {
            debug!(endpoint = %def.name, %root, "root failed");
        }
        return Err(GenerateError::Closure {
            endpoint: endpoint.name,
            failed,
        });
    }
    let union = SerializableTypeOracleUnion::new(read, write);
    let plan = FieldSerializerPlan::build(provider, &union)?;
    debug!(endpoint = %def.name, types = plan.types().len(), "planned");
    Ok(Analysis {
        endpoint,
        union,
        plan,
    })
}

/// Generate the module for one endpoint without touching the filesystem.
pub fn generate_endpoint(
    provider: &dyn TypeInfoProvider,
    index: &SubtypeIndex,
    def: &EndpointDef,
    options: BuilderOptions,
) -> Result<GeneratedEndpoint, GenerateError> {
    let analysis = analyze_endpoint(provider, index, def, options)?;
    let code = emit::render_endpoint(&analysis.endpoint, &analysis.plan)?;
    Ok(GeneratedEndpoint {
        endpoint: def.name.clone(),
        module_name: module_name(&def.name),
        code,
    })
}

/// Load the registry file plus any extra registries.
pub fn load_registry(known_types: &Path, extras: &[PathBuf]) -> Result<SubtypeRegistry> {
    let mut registry = SubtypeRegistry::load(known_types)
        .with_context(|| format!("loading {}", known_types.display()))?;
    for extra in extras {
        let more = SubtypeRegistry::load(extra)
            .with_context(|| format!("loading {}", extra.display()))?;
        registry.merge(&more);
    }
    Ok(registry)
}

/// Run the whole pipeline. Endpoint failures are collected in the report;
/// only I/O and schema problems abort the run.
pub fn run(request: &GenerateRequest) -> Result<GenerateReport> {
    let _span = info_span!("generate", schema = %request.schema.display()).entered();
    let schema = Schema::load(&request.schema)
        .with_context(|| format!("loading schema {}", request.schema.display()))?;
    let mut registry = load_registry(&request.known_types_file, &request.extra_known_types)?;
    let discovered = registry.merge_discovered(&schema);
    let index = registry.subtype_index(&schema);

    fs::create_dir_all(&request.output_dir)
        .with_context(|| format!("creating {}", request.output_dir.display()))?;

    let mut report = GenerateReport {
        discovered,
        ..GenerateReport::default()
    };
    for def in schema.endpoints() {
        if !request.endpoints.is_empty() && !request.endpoints.iter().any(|e| e == &def.name) {
            continue;
        }
        match generate_endpoint(&schema, &index, def, request.options) {
            Ok(generated) => {
                let path = request
                    .output_dir
                    .join(format!("{}.rs", generated.module_name));
                fs::write(&path, &generated.code)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(endpoint = %def.name, path = %path.display(), "generated");
                report.generated.push(path);
            }
            Err(err) => {
                warn!(endpoint = %def.name, error = %err, "endpoint failed");
                report.failures.push((def.name.clone(), err));
            }
        }
    }

    registry
        .persist(&request.known_types_file)
        .with_context(|| format!("writing {}", request.known_types_file.display()))?;
    report.known_types = registry.len();
    info!(
        generated = report.generated.len(),
        failed = report.failures.len(),
        known_types = report.known_types,
        "run complete"
    );
    Ok(report)
}
