//! Mode and state selections, and the diff between a selection and its
//! reference Hamiltonian.
//!
//! Two numberings of electronic states coexist in this crate:
//!
//! - the *sublevel-resolved* numbering of [`crate::hamiltonian::StateIndexMap`],
//!   used for matrix terms, and
//! - the *flat state numbering* defined here, `1..=Σ states[m]`, which lists
//!   every state once (multiplicity-major, sublevels ignored) and is what the
//!   combination generator subsets.

use crate::hamiltonian::{state_in_universe, Hamiltonian};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Sorted set of kept mode indices.
pub type ModeSelection = BTreeSet<usize>;

/// Kept original state indices (1-based), one list per multiplicity.
pub type StateSelection = Vec<Vec<usize>>;

/// Errors raised for selections that do not fit a Hamiltonian.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// The selection has a different number of multiplicities
    #[error("State selection covers {found} multiplicities, Hamiltonian has {expected}")]
    MultiplicityMismatch {
        /// Multiplicities in the Hamiltonian
        expected: usize,
        /// Multiplicities in the selection
        found: usize,
    },
    /// A selected state does not exist
    #[error("State {state} of multiplicity {mult} is out of range (1..={available})")]
    StateOutOfRange {
        /// Multiplicity (1-based)
        mult: usize,
        /// Selected state index
        state: usize,
        /// Number of states of the multiplicity
        available: usize,
    },
    /// A state is listed twice
    #[error("State {state} of multiplicity {mult} is selected more than once")]
    DuplicateState {
        /// Multiplicity (1-based)
        mult: usize,
        /// Repeated state index
        state: usize,
    },
    /// A kept mode has no kappa or lambda term
    #[error("Mode {0} is not used by any kappa or lambda term")]
    UnknownMode(usize),
    /// A pin names a state outside the universe
    #[error("Pinned state {0} is outside the state universe")]
    InvalidPin(StatePin),
    /// The sidecar text cannot be read back
    #[error("Malformed changed_parameters file at line {line}: {message}")]
    MalformedSidecar {
        /// 1-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },
}

type Result<T> = std::result::Result<T, SelectionError>;

/// A state that must survive every reduction, written `mult:index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatePin {
    /// Multiplicity (1-based)
    pub mult: usize,
    /// State index within the multiplicity (1-based)
    pub state: usize,
}

impl fmt::Display for StatePin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mult, self.state)
    }
}

/// Selection that keeps every state of every multiplicity.
pub fn full_state_selection(states: &[usize]) -> StateSelection {
    states.iter().map(|&n| (1..=n).collect()).collect()
}

/// Checks a state selection against per-multiplicity state counts.
pub fn validate_state_selection(states: &[usize], selection: &StateSelection) -> Result<()> {
    if selection.len() != states.len() {
        return Err(SelectionError::MultiplicityMismatch {
            expected: states.len(),
            found: selection.len(),
        });
    }

    for (m, kept) in selection.iter().enumerate() {
        let mult = m + 1;
        let mut seen = BTreeSet::new();
        for &state in kept {
            if !state_in_universe(states, mult, state) {
                return Err(SelectionError::StateOutOfRange {
                    mult,
                    state,
                    available: states[m],
                });
            }
            if !seen.insert(state) {
                return Err(SelectionError::DuplicateState { mult, state });
            }
        }
    }
    Ok(())
}

/// Checks that every kept mode is used by the Hamiltonian.
pub fn validate_mode_selection(used_modes: &BTreeSet<usize>, modes: &ModeSelection) -> Result<()> {
    match modes.iter().find(|&&mode| !used_modes.contains(&mode)) {
        Some(&mode) => Err(SelectionError::UnknownMode(mode)),
        None => Ok(()),
    }
}

/// Total number of states in the flat numbering.
pub fn total_states(states: &[usize]) -> usize {
    states.iter().sum()
}

/// Flat (1-based, multiplicity-major) number of a state.
pub fn flat_state_number(states: &[usize], mult: usize, state: usize) -> Option<usize> {
    if !state_in_universe(states, mult, state) {
        return None;
    }
    let offset: usize = states[..mult - 1].iter().sum();
    Some(offset + state)
}

/// Splits flat state numbers back into a per-multiplicity selection.
///
/// The output lists are ascending whatever the input order. Numbers outside
/// `1..=total_states(states)` are dropped.
pub fn unflatten(states: &[usize], flat: &[usize]) -> StateSelection {
    let mut selection: StateSelection = vec![Vec::new(); states.len()];
    let mut sorted: Vec<usize> = flat.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    for number in sorted {
        let mut offset = 0;
        for (m, &count) in states.iter().enumerate() {
            if number > offset && number <= offset + count {
                selection[m].push(number - offset);
                break;
            }
            offset += count;
        }
    }
    selection
}

/// Converts pins into flat state numbers, rejecting pins outside the universe.
pub fn pins_to_flat(states: &[usize], pins: &[StatePin]) -> Result<BTreeSet<usize>> {
    pins.iter()
        .map(|pin| {
            flat_state_number(states, pin.mult, pin.state).ok_or(SelectionError::InvalidPin(*pin))
        })
        .collect()
}

/// What a combination removed relative to its reference Hamiltonian.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedParameters {
    /// Removed mode indices, ascending
    pub modes: Vec<usize>,
    /// Removed original state indices per multiplicity, ascending
    pub states: Vec<Vec<usize>>,
}

impl RemovedParameters {
    /// Diff between the reference Hamiltonian and a kept selection.
    pub fn between(
        reference: &Hamiltonian,
        modes: &ModeSelection,
        states: &StateSelection,
    ) -> Self {
        let removed_modes = reference
            .used_modes()
            .iter()
            .filter(|&&mode| !modes.contains(&mode))
            .copied()
            .collect();

        let removed_states = reference
            .states()
            .iter()
            .enumerate()
            .map(|(m, &count)| {
                let kept = states.get(m).map(Vec::as_slice).unwrap_or(&[]);
                (1..=count).filter(|s| !kept.contains(s)).collect()
            })
            .collect();

        Self {
            modes: removed_modes,
            states: removed_states,
        }
    }

    /// True when nothing at all was removed.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty() && self.states.iter().all(Vec::is_empty)
    }

    /// Renders the `changed_parameters` sidecar text.
    ///
    /// ```text
    /// removed_modes
    /// 7 9
    /// removed_states
    /// Mult 1: 2
    /// Mult 2:
    /// Mult 3: 1
    /// ```
    ///
    /// Each block only appears when something of its kind was removed; an
    /// unchanged combination renders as an empty string.
    pub fn to_sidecar(&self) -> String {
        let mut out = String::new();
        if !self.modes.is_empty() {
            out.push_str("removed_modes\n");
            out.push_str(&join(&self.modes, " "));
            out.push('\n');
        }
        if self.states.iter().any(|s| !s.is_empty()) {
            out.push_str("removed_states\n");
            for (m, removed) in self.states.iter().enumerate() {
                if removed.is_empty() {
                    out.push_str(&format!("Mult {}:\n", m + 1));
                } else {
                    out.push_str(&format!("Mult {}: {}\n", m + 1, join(removed, " ")));
                }
            }
        }
        out
    }

    /// Reads a `changed_parameters` sidecar back.
    ///
    /// `states` holds one entry per `Mult` line present, so a file without a
    /// `removed_states` block yields an empty `states` list.
    pub fn parse(text: &str) -> Result<Self> {
        let mut result = Self::default();
        let lines: Vec<&str> = text.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim();
            if line.is_empty() {
                i += 1;
                continue;
            }

            if line == "removed_modes" {
                let values = lines.get(i + 1).ok_or_else(|| SelectionError::MalformedSidecar {
                    line: i + 2,
                    message: "missing mode list after 'removed_modes'".to_string(),
                })?;
                result.modes = parse_indices(values.split_whitespace(), i + 2)?;
                i += 2;
            } else if line == "removed_states" {
                i += 1;
            } else if line.starts_with("Mult") {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                let mult = tokens
                    .get(1)
                    .and_then(|t| t.trim_end_matches(':').parse::<usize>().ok())
                    .ok_or_else(|| SelectionError::MalformedSidecar {
                        line: i + 1,
                        message: format!("invalid multiplicity line '{}'", line),
                    })?;
                if mult != result.states.len() + 1 {
                    return Err(SelectionError::MalformedSidecar {
                        line: i + 1,
                        message: format!(
                            "expected multiplicity {}, found {}",
                            result.states.len() + 1,
                            mult
                        ),
                    });
                }
                result
                    .states
                    .push(parse_indices(tokens.into_iter().skip(2), i + 1)?);
                i += 1;
            } else {
                return Err(SelectionError::MalformedSidecar {
                    line: i + 1,
                    message: format!("unexpected line '{}'", line),
                });
            }
        }
        Ok(result)
    }
}

fn parse_indices<'a>(tokens: impl Iterator<Item = &'a str>, line: usize) -> Result<Vec<usize>> {
    tokens
        .map(|t| {
            t.parse::<usize>().map_err(|_| SelectionError::MalformedSidecar {
                line,
                message: format!("invalid index '{}'", t),
            })
        })
        .collect()
}

pub(crate) fn join(values: &[usize], separator: &str) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}
