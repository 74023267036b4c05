// Mining configuration
//
// Defaults follow the usual model-inference settings: k-tails lookahead of
// two, minimization after every intersection, spurious-edge removal off.

use crate::error::{ModelError, Result};
use crate::invariants::Invariant;
use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which synthesis engine builds the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Partition refinement against the mined invariants (or k-tails)
    #[default]
    Refine,
    /// Intersection of per-invariant automata
    Intersect,
}

/// Model variants written to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportVariant {
    Nfa,
    Dfa,
    InvariantDfas,
}

/// Configuration for one mining run
///
/// # Example
/// ```
/// use tracemint::config::MiningConfig;
///
/// let config = MiningConfig::default();
/// assert_eq!(config.k_tail_length, 2);
/// assert!(config.minimize_intersections);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub mode: Mode,

    /// Lookahead of the k-tails equivalence; must be positive
    pub k_tail_length: usize,

    /// Build a k-tails model: instead of refinement in `Refine` mode, as an
    /// extra product operand in `Intersect` mode
    pub perform_ktails: bool,

    /// Minimize after every intersection instead of once at the end
    pub minimize_intersections: bool,

    /// Drop automaton transitions no input trace traverses
    pub remove_spurious_edges: bool,

    /// Merge unneeded partitions after refinement
    pub coarsen: bool,

    /// Treat the input as distributed even when it comes from one process
    pub distributed: bool,

    pub export: Vec<ExportVariant>,

    /// Ceiling on joint states explored by global composition
    pub max_explored_states: Option<usize>,

    /// Invariants every model must satisfy on top of the mined ones
    ///
    /// Multi-process runs apply each one to the processes whose qualified
    /// event types it names.
    pub required_invariants: Vec<Invariant>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Refine,
            k_tail_length: 2,
            perform_ktails: false,
            minimize_intersections: true,
            remove_spurious_edges: false,
            coarsen: true,
            distributed: false,
            export: vec![ExportVariant::Dfa],
            max_explored_states: Some(100_000),
            required_invariants: Vec::new(),
        }
    }
}

impl MiningConfig {
    /// k-tails model with the given lookahead
    pub fn ktails(k: usize) -> Self {
        Self {
            k_tail_length: k,
            perform_ktails: true,
            ..Self::default()
        }
    }

    /// Intersection model restricted to transitions the traces exercise
    pub fn strict() -> Self {
        Self {
            mode: Mode::Intersect,
            remove_spurious_edges: true,
            export: vec![ExportVariant::Dfa, ExportVariant::InvariantDfas],
            ..Self::default()
        }
    }

    pub fn exports(&self, variant: ExportVariant) -> bool {
        self.export.contains(&variant)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_tail_length == 0 {
            return Err(ModelError::InvalidConfig(
                "k_tail_length must be positive".to_string(),
            ));
        }
        if self.max_explored_states == Some(0) {
            return Err(ModelError::InvalidConfig(
                "max_explored_states must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a TOML configuration file
    ///
    /// Keys missing from the file keep their default values.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}
