//! Frequency masking for molden normal-mode files.

use std::collections::BTreeSet;

/// Replaces the frequencies of `removed_modes` by `0.0`.
///
/// Inside the `[FREQ]` section the k-th line (1-based) holds the frequency of
/// mode k. A line starting a new `[...]` section ends the frequency block
/// before it is counted. Every line is re-emitted with its tokens joined by
/// single spaces.
///
/// # Examples
///
/// ```
/// use lvcgym::molden::zero_frequencies;
///
/// let text = "[FREQ]\n  100.0\n  200.0\n[FR-COORD]\nC 0.0 0.0 0.0\n";
/// let masked = zero_frequencies(text, &[2].into_iter().collect());
/// assert_eq!(masked, "[FREQ]\n100.0\n0.0\n[FR-COORD]\nC 0.0 0.0 0.0\n");
/// ```
pub fn zero_frequencies(text: &str, removed_modes: &BTreeSet<usize>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_freq = false;
    let mut mode = 0;

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if line.contains('[') {
            in_freq = tokens.iter().any(|t| t.eq_ignore_ascii_case("[FREQ]"));
            mode = 0;
            out.push_str(&tokens.join(" "));
        } else if in_freq {
            mode += 1;
            if removed_modes.contains(&mode) {
                out.push_str("0.0");
            } else {
                out.push_str(&tokens.join(" "));
            }
        } else {
            out.push_str(&tokens.join(" "));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOLDEN: &str = "[Molden Format]
[FREQ]
   0.00
   0.00
 512.31
 1024.7
[FR-COORD]
C   0.000   0.000   0.000
[FR-NORM-COORD]
vibration 1
";

    fn modes(values: &[usize]) -> BTreeSet<usize> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_removed_modes_are_zeroed() {
        let masked = zero_frequencies(MOLDEN, &modes(&[3]));
        let lines: Vec<&str> = masked.lines().collect();
        assert_eq!(lines[4], "0.0");
        assert_eq!(lines[5], "1024.7");
    }

    #[test]
    fn test_section_headers_are_never_counted() {
        let masked = zero_frequencies(MOLDEN, &modes(&[5]));
        assert!(masked.contains("[FR-COORD]\n"));
        assert!(!masked.contains("\n0.0\n"));
        assert!(masked.contains("C 0.000 0.000 0.000\n"));
    }

    #[test]
    fn test_no_removed_modes_only_normalises_whitespace() {
        let masked = zero_frequencies(MOLDEN, &BTreeSet::new());
        assert!(masked.starts_with("[Molden Format]\n[FREQ]\n0.00\n0.00\n512.31\n"));
    }
}
