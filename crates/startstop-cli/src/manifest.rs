//! TOML manifest describing a step tree of shell commands.
//!
//! ```toml
//! [settings]
//! stop_order = "reversed"
//!
//! [[steps]]
//! name = "db"
//! start = "docker start db"
//! stop = "docker stop db"
//!
//! [[steps]]
//! group = [
//!     { name = "api", start = "./api.sh start", stop = "./api.sh stop", workdir = "services" },
//! ]
//! ```
//!
//! Each `[[steps]]` entry is either a step or a `group` of entries. Step
//! names must be non-empty and unique across the whole tree.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use startstop_core::{Step, StepNode, StepTree};
use startstop_types::ControllerConfig;
use thiserror::Error;

use crate::shell::ShellCommand;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("step name must not be empty")]
    EmptyName,

    #[error("duplicate step name: '{0}'")]
    DuplicateName(String),
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub settings: ControllerConfig,

    #[serde(default)]
    pub steps: Vec<NodeSpec>,
}

/// One `[[steps]]` entry.
///
/// `Group` is tried first so that an entry with only a `group` key never
/// parses as a step.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Group(GroupSpec),
    Step(StepSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub group: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    pub name: String,
    pub start: Option<String>,
    pub stop: Option<String>,
    pub workdir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Parsing and validation
// ---------------------------------------------------------------------------

impl Manifest {
    /// Parse and validate a manifest.
    pub fn from_toml_str(input: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(input)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, parse, and validate the manifest at `path`.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let input = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest = Self::from_toml_str(&input)?;
        tracing::debug!(path = %path.display(), "loaded manifest");
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        validate_nodes(&self.steps, &mut seen)
    }

    /// Build the step tree, wiring each command into a shell action.
    pub fn to_tree(&self) -> StepTree {
        build_tree(&self.steps)
    }
}

fn validate_nodes<'a>(nodes: &'a [NodeSpec], seen: &mut HashSet<&'a str>) -> Result<(), ManifestError> {
    for node in nodes {
        match node {
            NodeSpec::Group(group) => validate_nodes(&group.group, seen)?,
            NodeSpec::Step(step) => {
                if step.name.trim().is_empty() {
                    return Err(ManifestError::EmptyName);
                }
                if !seen.insert(step.name.as_str()) {
                    return Err(ManifestError::DuplicateName(step.name.clone()));
                }
            }
        }
    }
    Ok(())
}

fn build_tree(nodes: &[NodeSpec]) -> StepTree {
    nodes
        .iter()
        .map(|node| -> StepNode {
            match node {
                NodeSpec::Group(group) => build_tree(&group.group).into(),
                NodeSpec::Step(spec) => build_step(spec).into(),
            }
        })
        .collect()
}

fn build_step(spec: &StepSpec) -> Step {
    let mut step = Step::new(spec.name.clone());
    if let Some(command) = &spec.start {
        let shell = shell_command(spec, command);
        step = step.on_start(move || shell.clone().run_step());
    }
    if let Some(command) = &spec.stop {
        let shell = shell_command(spec, command);
        step = step.on_stop(move || shell.clone().run_step());
    }
    step
}

fn shell_command(spec: &StepSpec, command: &str) -> ShellCommand {
    ShellCommand::new(command)
        .workdir(spec.workdir.clone())
        .envs(spec.env.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
