// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `serial-gen`: generate field serializers for the endpoints of a schema.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serial_gen::{
    analyze_endpoint, load_registry, run, ConfigStore, ConfigUpdate, FsConfigStore, GenConfig,
    GenerateRequest, CONFIG_KEY,
};
use serial_oracle::{BuilderOptions, Schema, KNOWN_TYPES_FILENAME};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Type-closure driven serializer generator")]
struct Args {
    /// Directory holding `serial-gen.json` (defaults to the user config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one module per endpoint and update the known-types registry
    Generate {
        /// Schema document (JSON)
        #[arg(long)]
        schema: PathBuf,
        /// Output directory (default: config `outputDir`, else `generated`)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Known-types registry (default: `<out>/knownTypes.txt`)
        #[arg(long)]
        known_types: Option<PathBuf>,
        /// Extra known-types files, merged but never rewritten (repeatable)
        #[arg(long)]
        extra_known_types: Vec<PathBuf>,
        /// Do not add known subtypes to write closures
        #[arg(long)]
        prune_write_subtypes: bool,
        /// Only generate these endpoints (repeatable)
        #[arg(long)]
        endpoint: Vec<String>,
    },
    /// Print the classified closure of each endpoint without writing anything
    Closure {
        /// Schema document (JSON)
        #[arg(long)]
        schema: PathBuf,
        /// Known-types registry to read
        #[arg(long)]
        known_types: Option<PathBuf>,
        /// Only show these endpoints (repeatable)
        #[arg(long)]
        endpoint: Vec<String>,
    },
    /// Show the stored settings, updating any that are given
    Config {
        /// Default output directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Default known-types registry
        #[arg(long)]
        known_types: Option<PathBuf>,
        /// Replace the stored extra known-types files (repeatable)
        #[arg(long)]
        extra_known_types: Vec<PathBuf>,
        /// Forget the stored extra known-types files
        #[arg(long, conflicts_with = "extra_known_types")]
        clear_extra_known_types: bool,
        /// Default for pruning known subtypes from write closures
        #[arg(long)]
        prune_write_subtypes: Option<bool>,
    },
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();
    Ok(())
}

fn config_store(dir: Option<&PathBuf>) -> Option<FsConfigStore> {
    match dir {
        Some(dir) => Some(FsConfigStore::at(dir)),
        None => FsConfigStore::user()
            .inspect_err(|err| warn!(%err, "using default settings"))
            .ok(),
    }
}

fn load_config(store: Option<&FsConfigStore>) -> Result<GenConfig> {
    store.map_or_else(
        || Ok(GenConfig::default()),
        |store| GenConfig::load(store).context("loading serial-gen config"),
    )
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose)?;
    let store = config_store(args.config_dir.as_ref());
    let config = load_config(store.as_ref())?;

    match args.command {
        Command::Generate {
            schema,
            out,
            known_types,
            extra_known_types,
            prune_write_subtypes,
            endpoint,
        } => {
            let output_dir = out
                .or_else(|| config.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("generated"));
            let known_types_file = known_types
                .or_else(|| config.known_types_file.clone())
                .unwrap_or_else(|| output_dir.join(KNOWN_TYPES_FILENAME));
            let mut extras = config.extra_known_types.clone();
            extras.extend(extra_known_types);
            let request = GenerateRequest {
                schema,
                output_dir,
                known_types_file,
                extra_known_types: extras,
                options: BuilderOptions {
                    prune_write_subtypes: prune_write_subtypes || config.prune_write_subtypes,
                },
                endpoints: endpoint,
            };
            let report = run(&request)?;
            let mut stdout = io::stdout().lock();
            for path in &report.generated {
                writeln!(stdout, "generated {}", path.display())?;
            }
            writeln!(
                stdout,
                "known types: {} ({} new)",
                report.known_types, report.discovered
            )?;
            for (endpoint, err) in &report.failures {
                if err.failed_roots().is_empty() {
                    error!(%endpoint, error = %err, "generation failed");
                }
            }
            for (endpoint, root) in report.failed_roots() {
                error!(
                    %endpoint,
                    direction = ?root.direction,
                    root = %root.problem.root,
                    error = %root.problem.error,
                    "root failed"
                );
            }
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Closure {
            schema,
            known_types,
            endpoint,
        } => {
            let doc = Schema::load(&schema)
                .with_context(|| format!("loading schema {}", schema.display()))?;
            let known_types = known_types
                .or_else(|| config.known_types_file.clone())
                .unwrap_or_else(|| PathBuf::from(KNOWN_TYPES_FILENAME));
            let mut registry = load_registry(&known_types, &config.extra_known_types)?;
            registry.merge_discovered(&doc);
            let index = registry.subtype_index(&doc);
            let options = BuilderOptions {
                prune_write_subtypes: config.prune_write_subtypes,
            };

            let mut failed = false;
            let mut stdout = io::stdout().lock();
            for def in doc.endpoints() {
                if !endpoint.is_empty() && !endpoint.contains(&def.name) {
                    continue;
                }
                match analyze_endpoint(&doc, &index, def, options) {
                    Ok(analysis) => {
                        writeln!(stdout, "{}", def.name)?;
                        for ty in analysis.union.serializable_types() {
                            if let Some(class) = analysis.union.classify(&ty) {
                                writeln!(stdout, "  {ty}\t{}", class.variant_name())?;
                            }
                        }
                    }
                    Err(err) => {
                        error!(endpoint = %def.name, error = %err, "closure failed");
                        failed = true;
                    }
                }
            }
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Config {
            out,
            known_types,
            extra_known_types,
            clear_extra_known_types,
            prune_write_subtypes,
        } => {
            let store = store.context("no config directory; pass --config-dir")?;
            let update = ConfigUpdate {
                output_dir: out,
                known_types_file: known_types,
                extra_known_types: (clear_extra_known_types || !extra_known_types.is_empty())
                    .then_some(extra_known_types),
                prune_write_subtypes,
            };
            let mut config = config;
            if !update.is_empty() {
                update.apply(&mut config);
                config.save(&store).context("saving serial-gen config")?;
                info!(path = %store.location(CONFIG_KEY), "settings saved");
            }
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", serde_json::to_string_pretty(&config)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
