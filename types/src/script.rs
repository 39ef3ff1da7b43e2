//! `ScriptArtifact`: an opaque reference to a user-supplied script.
//!
//! Packaging, signed upload, and content-addressable-storage retrieval are
//! external collaborators; by the time a `ScriptArtifact` reaches this
//! workspace it already resolves to a local path the chosen sandbox variant
//! can mount or copy into the guest's environment.

use std::path::{Path, PathBuf};

/// An opaque handle to the compiled guest binary (or script bundle) to
/// execute. Treated as a black box: the sandbox passes it through to the
/// guest process without inspecting its contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptArtifact(PathBuf);

impl ScriptArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for ScriptArtifact {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for ScriptArtifact {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}
