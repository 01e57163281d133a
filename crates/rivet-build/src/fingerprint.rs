//! Build fingerprinting: a deterministic hash of all compilation inputs
//! (source contents, library identity, target framework, configuration).

use std::path::PathBuf;

use sha2::{Digest, Sha256};

use rivet_core::library::{LibraryIdentity, TargetFramework};
use rivet_util::errors::{RivetError, RivetResult};

/// A computed build fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: String,
}

/// Compute the fingerprint for one library's compilation.
///
/// `sources` must already be in deterministic order.
pub fn compute(
    identity: &LibraryIdentity,
    target: &TargetFramework,
    configuration: &str,
    sources: &[PathBuf],
) -> RivetResult<Fingerprint> {
    let mut hasher = Sha256::new();

    hasher.update(b"library:");
    hasher.update(identity.to_string().as_bytes());
    hasher.update(b"\n");

    hasher.update(b"target:");
    hasher.update(target.as_str().as_bytes());
    hasher.update(b"\n");

    hasher.update(b"config:");
    hasher.update(configuration.as_bytes());
    hasher.update(b"\n");

    for source in sources {
        hasher.update(b"file:");
        hasher.update(source.to_string_lossy().as_bytes());
        hasher.update(b"\n");
        let contents = std::fs::read(source).map_err(RivetError::Io)?;
        hasher.update(&contents);
        hasher.update(b"\n");
    }

    Ok(Fingerprint {
        hash: format!("{:x}", hasher.finalize()),
    })
}
