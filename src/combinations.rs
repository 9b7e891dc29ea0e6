//! Enumeration of mode and state subsets by removal depth.
//!
//! Depth `i` holds every subset obtained by removing exactly `i` elements
//! from the universe. A maximum depth of `d` produces the groups for depths
//! `0..d`, stopping early once no element is left to remove.

use crate::selection::{
    pins_to_flat, total_states, unflatten, ModeSelection, SelectionError, StatePin,
    StateSelection,
};
use itertools::Itertools;
use log::debug;

/// All subsets produced at one removal depth.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGroup<T> {
    /// Number of removed elements
    pub depth: usize,
    /// Subsets in lexicographic-combination order
    pub members: Vec<T>,
}

impl<T> DepthGroup<T> {
    /// Label used in progress output, e.g. `depth_1`.
    pub fn label(&self) -> String {
        format!("depth_{}", self.depth)
    }
}

/// Size-`k` subsets of `universe` for `k` from `n` down to `n - max_depth + 1`.
///
/// The universe is sorted and deduplicated first. `max_depth == 0` yields no
/// group at all; depth 0 always yields exactly the full universe.
pub fn subsets_by_depth(universe: &[usize], max_depth: usize) -> Vec<DepthGroup<Vec<usize>>> {
    let sorted: Vec<usize> = universe.iter().copied().sorted_unstable().dedup().collect();
    let n = sorted.len();

    (0..max_depth.min(n + 1))
        .map(|depth| DepthGroup {
            depth,
            members: sorted.iter().copied().combinations(n - depth).collect(),
        })
        .collect()
}

/// Mode subsets of `used_modes` up to `max_depth`.
///
/// # Examples
///
/// ```
/// use lvcgym::combinations::mode_combinations;
///
/// let groups = mode_combinations([3, 5, 9].iter().copied(), 2);
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].members.len(), 1);
/// assert_eq!(groups[1].members.len(), 3);
/// ```
pub fn mode_combinations(
    used_modes: impl IntoIterator<Item = usize>,
    max_depth: usize,
) -> Vec<DepthGroup<ModeSelection>> {
    let universe: Vec<usize> = used_modes.into_iter().collect();
    subsets_by_depth(&universe, max_depth)
        .into_iter()
        .map(|group| DepthGroup {
            depth: group.depth,
            members: group
                .members
                .into_iter()
                .map(|subset| subset.into_iter().collect())
                .collect(),
        })
        .collect()
}

/// State subsets up to `max_depth`, always keeping the pinned states.
///
/// The states are numbered `1..=Σ states` (multiplicity-major), pinned
/// numbers are taken out of the universe, the rest is subset, and every
/// subset gets the pins back before being split into a per-multiplicity
/// selection.
///
/// # Errors
///
/// Returns [`SelectionError::InvalidPin`] for a pin outside the state
/// universe.
pub fn state_combinations(
    states: &[usize],
    max_depth: usize,
    pinned: &[StatePin],
) -> Result<Vec<DepthGroup<StateSelection>>, SelectionError> {
    let pinned_flat = pins_to_flat(states, pinned)?;
    let universe: Vec<usize> = (1..=total_states(states))
        .filter(|number| !pinned_flat.contains(number))
        .collect();
    debug!(
        "State universe of {} states ({} pinned)",
        universe.len(),
        pinned_flat.len()
    );

    let groups = subsets_by_depth(&universe, max_depth)
        .into_iter()
        .map(|group| DepthGroup {
            depth: group.depth,
            members: group
                .members
                .into_iter()
                .map(|mut subset| {
                    subset.extend(pinned_flat.iter().copied());
                    unflatten(states, &subset)
                })
                .collect(),
        })
        .collect();
    Ok(groups)
}

/// Number of size-`k` subsets of an `n`-element set, saturating at
/// `usize::MAX`.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // acc is C(n, i) here, so the division is exact
        acc = match acc.checked_mul((n - i) as u128) {
            Some(product) => product / (i as u128 + 1),
            None => return usize::MAX,
        };
    }
    usize::try_from(acc).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_zero_is_full_set() {
        let groups = mode_combinations(vec![9, 3, 5, 3], 1);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label(), "depth_0");
        let expected: ModeSelection = [3, 5, 9].into_iter().collect();
        assert_eq!(groups[0].members, vec![expected]);
    }

    #[test]
    fn test_mode_depth_one_order() {
        let groups = subsets_by_depth(&[3, 5, 9], 2);
        assert_eq!(
            groups[1].members,
            vec![vec![3, 5], vec![3, 9], vec![5, 9]]
        );
    }

    #[test]
    fn test_max_depth_zero_yields_nothing() {
        assert!(mode_combinations(vec![1, 2], 0).is_empty());
    }

    #[test]
    fn test_depth_stops_at_empty_set() {
        let groups = subsets_by_depth(&[1, 2], 10);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].members, vec![Vec::<usize>::new()]);
    }

    #[test]
    fn test_group_sizes_follow_binomial() {
        let universe: Vec<usize> = (1..=6).collect();
        for group in subsets_by_depth(&universe, 7) {
            assert_eq!(group.members.len(), binomial(6, 6 - group.depth));
        }
    }

    #[test]
    fn test_pins_leave_the_flat_state_universe() {
        let pin = StatePin { mult: 1, state: 1 };

        // One singlet and one triplet: only the triplet is left to remove
        let groups = state_combinations(&[1, 1], 2, &[pin]).unwrap();
        assert_eq!(groups[0].members, vec![vec![vec![1], vec![1]]]);
        assert_eq!(groups[1].members.len(), 1);
        assert_eq!(groups[1].members[0], vec![vec![1], vec![]]);

        // Sublevels do not enlarge the universe: two free states remain
        let groups = state_combinations(&[2, 1], 2, &[pin]).unwrap();
        assert_eq!(groups[0].members, vec![vec![vec![1, 2], vec![1]]]);
        assert_eq!(
            groups[1].members,
            vec![vec![vec![1, 2], vec![]], vec![vec![1], vec![1]]]
        );
        for members in &groups[1].members {
            assert!(members[0].contains(&1));
        }
    }

    #[test]
    fn test_state_combinations_without_pins() {
        let groups = state_combinations(&[1, 1], 2, &[]).unwrap();
        assert_eq!(groups[1].members.len(), 2);
        assert_eq!(groups[1].members[0], vec![vec![1], vec![]]);
        assert_eq!(groups[1].members[1], vec![vec![], vec![1]]);
    }

    #[test]
    fn test_state_combinations_unflatten_per_multiplicity() {
        let groups = state_combinations(&[2, 0, 1], 2, &[]).unwrap();
        assert_eq!(groups[0].members, vec![vec![vec![1, 2], vec![], vec![1]]]);
        assert_eq!(
            groups[1].members,
            vec![
                vec![vec![1, 2], vec![], vec![]],
                vec![vec![1], vec![], vec![1]],
                vec![vec![2], vec![], vec![1]],
            ]
        );
    }

    #[test]
    fn test_invalid_pin_is_rejected() {
        let pin = StatePin { mult: 3, state: 2 };
        assert_eq!(
            state_combinations(&[2, 0, 1], 1, &[pin]),
            Err(SelectionError::InvalidPin(pin))
        );
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(4, 0), 1);
        assert_eq!(binomial(3, 4), 0);
        assert_eq!(binomial(64, 32), 1_832_624_140_942_590_534);
    }

    #[test]
    fn test_binomial_saturates() {
        assert_eq!(binomial(200, 100), usize::MAX);
        assert_eq!(binomial(200, 1), 200);
    }
}
