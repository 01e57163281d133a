//! Core data types for the Rivet toolchain.
//!
//! This crate defines the fundamental types shared by the resolver and the
//! build layer: the version model, library identities and descriptions,
//! target frameworks, project manifests, and workspace discovery.
//!
//! This crate is intentionally free of async code and network I/O.

/// File name of a Rivet project manifest.
pub const MANIFEST_FILE: &str = "rivet.toml";

pub mod library;
pub mod manifest;
pub mod version;
pub mod workspace;
