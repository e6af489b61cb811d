//! Artifact export and read-back.

pub mod artifacts;

pub use artifacts::{ArtifactManager, ArtifactPaths, LoadedRun, RunManifest};
