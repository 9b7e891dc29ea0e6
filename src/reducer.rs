//! Derivation of a smaller Hamiltonian from a subset of modes and states.
//!
//! Reduction never mutates its input. Linear terms keep a row only when every
//! state it references survives (and, for kappa and lambda, its mode too) and
//! renumber surviving states by their rank inside the kept list of their
//! multiplicity. Matrix terms keep the rows and columns of every sublevel of
//! every kept state, in ascending original order.

use crate::hamiltonian::{Epsilon, Hamiltonian, Kappa, Lambda};
use crate::selection::{
    validate_mode_selection, validate_state_selection, ModeSelection, SelectionError,
    StateSelection,
};
use log::debug;
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Rank (1-based) of each kept state inside its multiplicity's kept list.
struct Renumbering {
    ranks: Vec<HashMap<usize, usize>>,
}

impl Renumbering {
    fn new(keep_states: &StateSelection) -> Self {
        let ranks = keep_states
            .iter()
            .map(|kept| {
                kept.iter()
                    .enumerate()
                    .map(|(rank, &state)| (state, rank + 1))
                    .collect()
            })
            .collect();
        Self { ranks }
    }

    fn new_index(&self, mult: usize, state: usize) -> Option<usize> {
        self.ranks.get(mult - 1)?.get(&state).copied()
    }
}

/// Builds the reduced Hamiltonian that keeps `keep_modes` and `keep_states`.
///
/// # Arguments
///
/// * `reference` - Hamiltonian to reduce (left untouched)
/// * `keep_modes` - modes whose kappa and lambda rows survive; must be a
///   subset of the reference's used modes, may be empty
/// * `keep_states` - kept original state indices per multiplicity; a
///   multiplicity may be dropped entirely with an empty list
///
/// # Returns
///
/// A new, independent Hamiltonian with `states[m] == keep_states[m].len()`,
/// or a [`SelectionError`] when the selection does not fit `reference`.
///
/// # Examples
///
/// ```
/// use lvcgym::hamiltonian::Hamiltonian;
/// use lvcgym::reducer::reduce;
/// use lvcgym::selection::ModeSelection;
///
/// let h = Hamiltonian::parse("v0\n2 0 1\nepsilon\n2\n  1 1 0.0\n  1 2 0.1\n")?;
/// let reduced = reduce(&h, &ModeSelection::new(), &vec![vec![2], vec![], vec![]])?;
/// assert_eq!(reduced.states(), &[1, 0, 0]);
/// assert_eq!(reduced.epsilon()[0].state, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn reduce(
    reference: &Hamiltonian,
    keep_modes: &ModeSelection,
    keep_states: &StateSelection,
) -> Result<Hamiltonian, SelectionError> {
    validate_state_selection(reference.states(), keep_states)?;
    validate_mode_selection(reference.used_modes(), keep_modes)?;

    let renumbering = Renumbering::new(keep_states);

    let epsilon: Vec<Epsilon> = reference
        .epsilon()
        .iter()
        .filter_map(|e| {
            Some(Epsilon {
                state: renumbering.new_index(e.mult, e.state)?,
                ..*e
            })
        })
        .collect();

    let kappa: Vec<Kappa> = reference
        .kappa()
        .iter()
        .filter(|k| keep_modes.contains(&k.mode))
        .filter_map(|k| {
            Some(Kappa {
                state: renumbering.new_index(k.mult, k.state)?,
                ..*k
            })
        })
        .collect();

    let lambda: Vec<Lambda> = reference
        .lambda()
        .iter()
        .filter(|l| keep_modes.contains(&l.mode))
        .filter_map(|l| {
            Some(Lambda {
                state1: renumbering.new_index(l.mult, l.state1)?,
                state2: renumbering.new_index(l.mult, l.state2)?,
                ..*l
            })
        })
        .collect();

    let kept_flat = kept_flat_indices(reference, keep_states);
    let matrices = reference
        .matrices()
        .iter()
        .map(|(&kind, matrix)| (kind, submatrix(matrix, &kept_flat)))
        .collect();

    let states: Vec<usize> = keep_states.iter().map(Vec::len).collect();
    debug!(
        "Reduced {:?} -> {:?}: {} epsilon, {} kappa, {} lambda rows kept",
        reference.states(),
        states,
        epsilon.len(),
        kappa.len(),
        lambda.len()
    );

    Ok(Hamiltonian::assemble(
        reference.reference().to_string(),
        states,
        epsilon,
        kappa,
        lambda,
        matrices,
    ))
}

/// Sublevel-resolved indices of every kept state, ascending.
fn kept_flat_indices(reference: &Hamiltonian, keep_states: &StateSelection) -> Vec<usize> {
    let map = reference.index_map();
    let mut indices: Vec<usize> = keep_states
        .iter()
        .enumerate()
        .flat_map(|(m, kept)| kept.iter().flat_map(move |&state| map.sublevels(m + 1, state)))
        .collect();
    indices.sort_unstable();
    indices
}

fn submatrix(matrix: &DMatrix<f64>, keep: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(keep.len(), keep.len(), |i, j| matrix[(keep[i], keep[j])])
}

impl Hamiltonian {
    /// Method form of [`reduce`].
    pub fn reduce(
        &self,
        keep_modes: &ModeSelection,
        keep_states: &StateSelection,
    ) -> Result<Hamiltonian, SelectionError> {
        reduce(self, keep_modes, keep_states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::MatrixKind;
    use crate::selection::full_state_selection;

    const TEMPLATE: &str = "v0.txt
2 0 1
epsilon
3
  1   1  0.0
  1   2  0.1
  3   1  0.2
kappa
3
  1   1     3  1.0e-3
  1   2     5  2.0e-3
  3   1     9  3.0e-3
lambda
2
  1   1   2   5  4.0e-3
  1   1   2   9  5.0e-3
SOC R
 0.0  1.0  2.0  3.0  4.0
10.0 11.0 12.0 13.0 14.0
20.0 21.0 22.0 23.0 24.0
30.0 31.0 32.0 33.0 34.0
40.0 41.0 42.0 43.0 44.0
DMZ I
 5.0  0.0  0.0  0.0  0.0
 0.0  6.0  0.0  0.0  0.0
 0.0  0.0  7.0  0.0  0.0
 0.0  0.0  0.0  8.0  0.0
 0.0  0.0  0.0  0.0  9.0
";

    fn modes(values: &[usize]) -> ModeSelection {
        values.iter().copied().collect()
    }

    #[test]
    fn test_full_selection_is_identity() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let reduced = reduce(&h, h.used_modes(), &full_state_selection(h.states())).unwrap();
        assert_eq!(reduced, h);
    }

    #[test]
    fn test_single_singlet_without_modes() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let reduced = reduce(&h, &ModeSelection::new(), &vec![vec![1], vec![], vec![]]).unwrap();

        assert_eq!(reduced.states(), &[1, 0, 0]);
        assert_eq!(reduced.nr_states(), 1);
        assert_eq!(reduced.epsilon().len(), 1);
        assert!(reduced.kappa().is_empty());
        assert!(reduced.lambda().is_empty());
        assert!(reduced.used_modes().is_empty());

        let soc = reduced.matrix(MatrixKind::SocReal).unwrap();
        assert_eq!(soc.shape(), (1, 1));
        assert_eq!(soc[(0, 0)], 0.0);
        assert_eq!(reduced.matrix(MatrixKind::DmzImag).unwrap()[(0, 0)], 5.0);
    }

    #[test]
    fn test_states_are_renumbered() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let reduced = reduce(&h, &modes(&[3, 5, 9]), &vec![vec![2], vec![], vec![1]]).unwrap();

        assert_eq!(reduced.states(), &[1, 0, 1]);
        assert_eq!(reduced.nr_states(), 4);
        let eps: Vec<(usize, usize)> = reduced.epsilon().iter().map(|e| (e.mult, e.state)).collect();
        assert_eq!(eps, vec![(1, 1), (3, 1)]);
        assert_eq!(reduced.epsilon()[0].energy, 0.1);
        // Singlet 2 becomes singlet 1; lambda rows lose singlet 1 and vanish
        assert_eq!(reduced.kappa().len(), 2);
        assert_eq!(reduced.kappa()[0].state, 1);
        assert_eq!(reduced.kappa()[0].mode, 5);
        assert!(reduced.lambda().is_empty());
        assert_eq!(reduced.used_modes().iter().copied().collect::<Vec<_>>(), vec![5, 9]);
    }

    #[test]
    fn test_matrix_keeps_all_sublevels_of_kept_states() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let reduced = reduce(&h, &ModeSelection::new(), &vec![vec![2], vec![], vec![1]]).unwrap();

        let soc = reduced.matrix(MatrixKind::SocReal).unwrap();
        assert_eq!(soc.shape(), (4, 4));
        // Original rows/cols 1, 2, 3, 4
        assert_eq!(soc[(0, 0)], 11.0);
        assert_eq!(soc[(0, 3)], 14.0);
        assert_eq!(soc[(3, 1)], 42.0);
    }

    #[test]
    fn test_dropping_modes_filters_couplings() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let reduced = reduce(&h, &modes(&[9]), &full_state_selection(h.states())).unwrap();
        assert_eq!(reduced.kappa().len(), 1);
        assert_eq!(reduced.lambda().len(), 1);
        assert_eq!(reduced.lambda()[0].mode, 9);
        assert_eq!(reduced.epsilon().len(), 3);
    }

    #[test]
    fn test_whole_multiplicity_can_be_dropped() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let reduced = reduce(&h, h.used_modes(), &vec![vec![1, 2], vec![], vec![]]).unwrap();
        assert_eq!(reduced.states(), &[2, 0, 0]);
        assert_eq!(reduced.multiplicities(), 3);
        assert!(reduced.kappa().iter().all(|k| k.mult == 1));
        assert_eq!(reduced.matrix(MatrixKind::SocReal).unwrap().shape(), (2, 2));
    }

    #[test]
    fn test_unsorted_selection_renumbers_in_selection_order() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let reduced = reduce(&h, h.used_modes(), &vec![vec![2, 1], vec![], vec![]]).unwrap();
        let first = reduced.epsilon().iter().find(|e| e.energy == 0.1).unwrap();
        assert_eq!(first.state, 1);
        // Matrix rows stay in ascending original order
        assert_eq!(reduced.matrix(MatrixKind::SocReal).unwrap()[(0, 1)], 1.0);
    }

    #[test]
    fn test_invalid_selections_are_rejected() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        assert!(matches!(
            reduce(&h, &modes(&[4]), &full_state_selection(h.states())),
            Err(SelectionError::UnknownMode(4))
        ));
        assert!(matches!(
            reduce(&h, &ModeSelection::new(), &vec![vec![1]]),
            Err(SelectionError::MultiplicityMismatch { .. })
        ));
        assert!(matches!(
            reduce(&h, &ModeSelection::new(), &vec![vec![3], vec![], vec![]]),
            Err(SelectionError::StateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_reduce_leaves_input_untouched() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let copy = h.clone();
        let _ = h.reduce(&ModeSelection::new(), &vec![vec![], vec![], vec![]]).unwrap();
        assert_eq!(h, copy);
    }
}
