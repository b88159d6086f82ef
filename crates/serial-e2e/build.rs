// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::print_stdout)]
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serial_oracle::{BuilderOptions, Schema, SubtypeRegistry};

fn main() -> anyhow::Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let schema_path = manifest_dir.join("schema/shapes.json");
    println!("cargo:rerun-if-changed={}", schema_path.display());

    let schema = Schema::load(&schema_path).context("loading schema/shapes.json")?;
    // Every type is visible in one round, so the schema alone seeds the registry.
    let mut registry = SubtypeRegistry::new();
    registry.merge_discovered(&schema);
    let index = registry.subtype_index(&schema);

    for def in schema.endpoints() {
        let generated =
            serial_gen::generate_endpoint(&schema, &index, def, BuilderOptions::default())
                .with_context(|| format!("generating {}", def.name))?;
        let dest = out_dir.join(format!("{}.rs", generated.module_name));
        fs::write(&dest, generated.code).with_context(|| format!("writing {}", dest.display()))?;
    }
    Ok(())
}
