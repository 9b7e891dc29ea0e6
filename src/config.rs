//! Configuration structures for lvcgym input files.
//!
//! This module defines the structures describing one gym run:
//!
//! - [`GymConfig`]: Main configuration structure with all parameters
//! - [`LoopKind`]: Hamiltonian loop or parameter loop
//! - [`Selector`]: How many modes or states a Hamiltonian loop removes
//!
//! Configuration can be parsed from input files (see [`crate::parser`]) or
//! created programmatically.

use crate::parameter_space::ScreeningRequest;
use crate::selection::StatePin;
use crate::workspace::OverwritePolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of sweep to set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopKind {
    /// Reduce the Hamiltonian in normal modes and/or states
    Hamiltonian,
    /// Screen surface hopping parameters on the full Hamiltonian
    Parameter,
}

impl LoopKind {
    /// Directory created under the output directory for this loop.
    pub fn dir_name(self) -> &'static str {
        match self {
            LoopKind::Hamiltonian => "hamiltonian_loop",
            LoopKind::Parameter => "parameter_loop",
        }
    }

    /// One-line description for help output.
    pub fn description(self) -> &'static str {
        match self {
            LoopKind::Hamiltonian => {
                "Loop to reduce the Hamiltonian either in normal modes or states"
            }
            LoopKind::Parameter => "Loop to determine the influence of surface hopping parameters",
        }
    }
}

/// Removal depth requested for modes or states.
///
/// | Selector | Generated subsets |
/// |----------|-------------------|
/// | `none` | only the full set |
/// | `all` | every subset down to a single remaining element |
/// | `depth N` | every subset with at most N elements removed |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Keep everything
    None,
    /// Remove down to a single element
    All,
    /// Remove up to N elements
    Depth(usize),
}

impl Selector {
    /// Maximum depth handed to the combination generator for a universe of
    /// `universe` elements.
    pub fn max_depth(self, universe: usize) -> usize {
        match self {
            Selector::None => 1,
            Selector::All => universe.max(1),
            Selector::Depth(n) => n + 1,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::None => write!(f, "none"),
            Selector::All => write!(f, "all"),
            Selector::Depth(n) => write!(f, "depth {}", n),
        }
    }
}

/// Complete configuration of one gym run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GymConfig {
    /// Reference LVC template
    pub template: PathBuf,
    /// Optional molden file whose frequencies are masked per combination
    pub molden: Option<PathBuf>,
    /// Which loop to set up
    pub loop_kind: LoopKind,
    /// Mode removal depth (Hamiltonian loop)
    pub mode_selector: Selector,
    /// State removal depth (Hamiltonian loop)
    pub state_selector: Selector,
    /// States kept in every state combination
    pub keep_states: Vec<StatePin>,
    /// Directory the loop directory is created in
    pub output_dir: PathBuf,
    /// Overwrite decision from the input file; `None` defers to the settings
    pub overwrite: Option<bool>,
    /// Surface hopping options (parameter loop)
    pub screening: ScreeningRequest,
}

impl Default for GymConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from("LVC.template"),
            molden: None,
            loop_kind: LoopKind::Hamiltonian,
            mode_selector: Selector::None,
            state_selector: Selector::None,
            keep_states: Vec::new(),
            output_dir: PathBuf::from("."),
            overwrite: None,
            screening: ScreeningRequest::default(),
        }
    }
}

impl GymConfig {
    /// Root directory of the loop, e.g. `./hamiltonian_loop`.
    pub fn loop_root(&self) -> PathBuf {
        self.output_dir.join(self.loop_kind.dir_name())
    }

    /// Overwrite policy for the whole run: the input file wins over the
    /// settings default.
    pub fn overwrite_policy(&self, settings_default: bool) -> OverwritePolicy {
        OverwritePolicy::from_flag(self.overwrite.unwrap_or(settings_default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_max_depth() {
        assert_eq!(Selector::None.max_depth(5), 1);
        assert_eq!(Selector::All.max_depth(5), 5);
        assert_eq!(Selector::All.max_depth(0), 1);
        assert_eq!(Selector::Depth(2).max_depth(5), 3);
    }

    #[test]
    fn test_loop_root() {
        let config = GymConfig {
            loop_kind: LoopKind::Parameter,
            output_dir: PathBuf::from("runs"),
            ..GymConfig::default()
        };
        assert_eq!(config.loop_root(), PathBuf::from("runs/parameter_loop"));
    }

    #[test]
    fn test_input_overwrite_wins_over_settings() {
        let mut config = GymConfig::default();
        assert_eq!(config.overwrite_policy(true), OverwritePolicy::Reuse);
        config.overwrite = Some(false);
        assert_eq!(config.overwrite_policy(true), OverwritePolicy::Refuse);
    }
}
