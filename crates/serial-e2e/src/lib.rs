// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Two endpoints generated at build time from `schema/shapes.json`.
//!
//! `ShapeClient` only writes drawings; `ShapeService` reads them. Each
//! module carries its own structs and dispatch table, so the two sides share
//! nothing but the wire format and the type signatures.

pub mod money;

/// Generated code for `demo.ShapeService`.
#[allow(missing_docs, non_camel_case_types, clippy::all, clippy::pedantic, clippy::nursery)]
pub mod shape_service {
    include!(concat!(env!("OUT_DIR"), "/shape_service.rs"));
}

/// Generated code for `demo.ShapeClient`.
#[allow(missing_docs, non_camel_case_types, clippy::all, clippy::pedantic, clippy::nursery)]
pub mod shape_client {
    include!(concat!(env!("OUT_DIR"), "/shape_client.rs"));
}
