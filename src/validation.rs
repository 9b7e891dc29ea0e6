//! Configuration validation for lvcgym runs.
//!
//! This module checks a parsed [`GymConfig`] against the reference
//! Hamiltonian before any output is written, and gives the user guidance on
//! what the run is going to produce.
//!
//! # Features
//!
//! - Selector depths checked against the mode and state universes
//! - Pinned states checked against the state counts
//! - Screening options checked before the parameter product is formed
//! - Warnings for keywords that the selected loop ignores

use crate::combinations::binomial;
use crate::config::{GymConfig, LoopKind, Selector};
use crate::hamiltonian::Hamiltonian;
use crate::parameter_space::{build_parameter_space, ScreeningRequest};
use crate::selection::{pins_to_flat, total_states};
use log::warn;
use std::collections::HashSet;
use std::path::Path;

/// Largest number of directories a Hamiltonian loop may set up.
pub const MAX_DIRECTORIES: usize = 1_000_000;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error with user guidance.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
    /// Optional reference to documentation or examples
    pub reference: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// A selector or pin does not fit the Hamiltonian
    InvalidSelection,
    /// A surface hopping option cannot be used
    InvalidOption,
    /// Invalid configuration parameters
    InvalidConfiguration,
    /// Missing required files
    MissingDependencies,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        if let Some(reference) = &self.reference {
            write!(f, "\n\nFor more information: {}", reference)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Validates a gym configuration against its reference Hamiltonian.
///
/// # Arguments
///
/// * `config` - The parsed gym input
/// * `hamiltonian` - The parsed reference template
///
/// # Returns
///
/// Returns `Ok(())` if the run can be set up, or a `ValidationError`
/// describing the first problem found and how to fix it.
pub fn validate_config(config: &GymConfig, hamiltonian: &Hamiltonian) -> ValidationResult<()> {
    if let Some(molden) = &config.molden {
        if !molden.exists() {
            return Err(ValidationError {
                category: ErrorCategory::MissingDependencies,
                message: format!("Molden file '{}' does not exist", molden.display()),
                suggestion: Some(
                    "Fix the 'molden' path or remove the keyword to skip frequency masking"
                        .to_string(),
                ),
                reference: None,
            });
        }
    }

    match config.loop_kind {
        LoopKind::Hamiltonian => validate_hamiltonian_loop(config, hamiltonian),
        LoopKind::Parameter => validate_parameter_loop(config, hamiltonian),
    }
}

fn validate_hamiltonian_loop(config: &GymConfig, hamiltonian: &Hamiltonian) -> ValidationResult<()> {
    let pinned = validate_pins(config, hamiltonian)?;

    let modes = hamiltonian.used_modes().len();
    validate_depth("mode_selector", config.mode_selector, modes, "modes")?;
    let free_states = total_states(hamiltonian.states()) - pinned;
    validate_depth(
        "state_selector",
        config.state_selector,
        free_states,
        "unpinned states",
    )?;

    let directories = directory_count(config, hamiltonian, free_states);
    if directories > MAX_DIRECTORIES {
        return Err(ValidationError {
            category: ErrorCategory::InvalidConfiguration,
            message: format!(
                "The selectors describe {} directories, the limit is {}",
                directories, MAX_DIRECTORIES
            ),
            suggestion: Some(
                "Replace 'all' with 'depth N' for mode_selector or state_selector".to_string(),
            ),
            reference: None,
        });
    }

    if modes == 0 && config.mode_selector != Selector::None {
        warn!("The template has no kappa or lambda terms, mode_selector has nothing to remove");
    }
    if config.screening != ScreeningRequest::default() {
        warn!("Screening keywords are ignored by the Hamiltonian loop");
    }
    Ok(())
}

fn validate_parameter_loop(config: &GymConfig, hamiltonian: &Hamiltonian) -> ValidationResult<()> {
    if config.mode_selector != Selector::None || config.state_selector != Selector::None {
        warn!("mode_selector and state_selector are ignored by the parameter loop");
    }
    if !config.keep_states.is_empty() {
        warn!("keep_states is ignored by the parameter loop");
    }

    build_parameter_space(&config.screening, hamiltonian.populated_multiplicities())
        .map(|_| ())
        .map_err(|e| ValidationError {
            category: ErrorCategory::InvalidOption,
            message: e.to_string(),
            suggestion: Some(
                "Run 'lvcgym --help options' to list the available option codes".to_string(),
            ),
            reference: None,
        })
}

/// Checks the pins and returns how many distinct states they hold.
fn validate_pins(config: &GymConfig, hamiltonian: &Hamiltonian) -> ValidationResult<usize> {
    let mut seen = HashSet::new();
    for pin in &config.keep_states {
        if !seen.insert(*pin) {
            warn!("State {} is listed more than once in keep_states", pin);
        }
    }

    pins_to_flat(hamiltonian.states(), &config.keep_states)
        .map(|flat| flat.len())
        .map_err(|e| ValidationError {
            category: ErrorCategory::InvalidSelection,
            message: e.to_string(),
            suggestion: Some(format!(
                "The template holds {:?} states per multiplicity; pins are written mult:index",
                hamiltonian.states()
            )),
            reference: None,
        })
}

fn validate_depth(
    keyword: &str,
    selector: Selector,
    universe: usize,
    what: &str,
) -> ValidationResult<()> {
    if let Selector::Depth(n) = selector {
        if n > universe {
            return Err(ValidationError {
                category: ErrorCategory::InvalidConfiguration,
                message: format!(
                    "{} depth {} exceeds the {} available {}",
                    keyword, n, universe, what
                ),
                suggestion: Some(format!(
                    "Use a depth of at most {} or '{} all'",
                    universe, keyword
                )),
                reference: None,
            });
        }
    }
    Ok(())
}

/// Number of subsets the generator yields for a universe of `n` elements,
/// saturating at `usize::MAX`.
pub fn combination_count(n: usize, max_depth: usize) -> usize {
    (0..max_depth.min(n + 1))
        .map(|depth| binomial(n, n - depth))
        .fold(0usize, |acc, count| acc.saturating_add(count))
}

/// Mode sets and state sets of a Hamiltonian loop.
fn set_counts(config: &GymConfig, hamiltonian: &Hamiltonian, free_states: usize) -> (usize, usize) {
    let modes = hamiltonian.used_modes().len();
    let mode_sets = combination_count(modes, config.mode_selector.max_depth(modes));
    let state_sets = combination_count(
        free_states,
        config
            .state_selector
            .max_depth(total_states(hamiltonian.states())),
    );
    (mode_sets, state_sets)
}

fn directory_count(config: &GymConfig, hamiltonian: &Hamiltonian, free_states: usize) -> usize {
    let (mode_sets, state_sets) = set_counts(config, hamiltonian, free_states);
    mode_sets.saturating_mul(state_sets)
}

/// Prints what the run is going to set up.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `hamiltonian` - The reference template
pub fn provide_user_guidance(config: &GymConfig, hamiltonian: &Hamiltonian) {
    println!("\n****Run Guidance****");
    println!(
        "Reference template: {:?} states per multiplicity, {} coupled modes",
        hamiltonian.states(),
        hamiltonian.used_modes().len()
    );

    match config.loop_kind {
        LoopKind::Hamiltonian => {
            let pinned = pins_to_flat(hamiltonian.states(), &config.keep_states)
                .map(|flat| flat.len())
                .unwrap_or(0);
            let free_states = total_states(hamiltonian.states()) - pinned;
            let (mode_sets, state_sets) = set_counts(config, hamiltonian, free_states);
            println!("Hamiltonian loop:");
            println!("- mode_selector {} gives {} mode sets", config.mode_selector, mode_sets);
            println!(
                "- state_selector {} gives {} state sets",
                config.state_selector, state_sets
            );
            println!(
                "- {} directories will be set up",
                mode_sets.saturating_mul(state_sets)
            );
        }
        LoopKind::Parameter => {
            println!("Parameter loop:");
            println!("- one traj_* directory per screened option combination");
            if hamiltonian.populated_multiplicities() < 2 {
                println!("- only one populated multiplicity: MCH representation is used");
            }
        }
    }

    println!("****End Run Guidance****\n");
}

/// Logs a written file when the print level asks for it.
///
/// # Arguments
///
/// * `operation` - Description of the file operation
/// * `path` - File that was written
/// * `print_level` - Print level (0=quiet, 1=normal, 2=verbose)
pub fn log_file_operation(operation: &str, path: &Path, print_level: u32) {
    if print_level >= 2 {
        println!("File Operation: {} - {}", operation, path.display());
    }
}
