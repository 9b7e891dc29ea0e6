//! In-memory model of an LVC Hamiltonian and its template text format.
//!
//! An `LVC.template` file describes a linear vibronic coupling Hamiltonian:
//!
//! ```text
//! v0.txt                 <- reference label (opaque)
//! 2 0 1                  <- number of states per multiplicity
//! epsilon
//! 3
//!   1   1  0.00000e+00   <- mult state energy
//!   1   2  1.20000e-01
//!   3   1  8.00000e-02
//! kappa
//! 1
//!   1   2     7  1.00000e-03   <- mult state mode coefficient
//! lambda
//! 1
//!   1   1   2   9  2.00000e-03 <- mult state1 state2 mode coefficient
//! SOC R
//! ... nr_states rows of nr_states values ...
//! ```
//!
//! Linear sections (`epsilon`, `kappa`, `lambda`) declare their length on the
//! line after the keyword. Matrix sections (`SOC R`, `SOC I`, `DMX R`, `DMY R`,
//! `DMZ R`, `DMX I`, `DMY I`, `DMZ I`) always hold `nr_states` rows, where
//! `nr_states` counts every magnetic sublevel: a multiplicity `m` block with
//! `n` states contributes `n * m` rows.
//!
//! Keywords are matched as case-insensitive substrings of a line. Every
//! coefficient is parsed into a typed number once, at ingestion; formatting is
//! confined to [`Hamiltonian::serialize`].

use crate::io::{format_scientific, read_text};
use log::debug;
use nalgebra::DMatrix;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading or assembling a Hamiltonian.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// I/O error when reading a template file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The template text violates the format
    #[error("Malformed template at line {line}: {message}")]
    Malformed {
        /// 1-based line number of the offending line
        line: usize,
        /// Description of the problem
        message: String,
    },
    /// Assembled parts do not describe a consistent Hamiltonian
    #[error("Inconsistent Hamiltonian: {0}")]
    Inconsistent(String),
}

type Result<T> = std::result::Result<T, TemplateError>;

fn malformed(line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Malformed {
        line,
        message: message.into(),
    }
}

/// Linear coupling sections, in their serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearKind {
    /// Diagonal energy offsets
    Epsilon,
    /// Intra-state linear couplings
    Kappa,
    /// Inter-state linear couplings
    Lambda,
}

impl LinearKind {
    /// All linear sections in serialization order.
    pub const ALL: [LinearKind; 3] = [LinearKind::Epsilon, LinearKind::Kappa, LinearKind::Lambda];

    /// Section keyword as written in templates.
    pub fn keyword(self) -> &'static str {
        match self {
            LinearKind::Epsilon => "epsilon",
            LinearKind::Kappa => "kappa",
            LinearKind::Lambda => "lambda",
        }
    }

    fn detect(line: &str) -> Option<Self> {
        let lower = line.to_lowercase();
        Self::ALL.into_iter().find(|kind| lower.contains(kind.keyword()))
    }
}

/// Dense matrix sections, in their serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatrixKind {
    /// Spin-orbit coupling, real part
    SocReal,
    /// Spin-orbit coupling, imaginary part
    SocImag,
    /// Dipole moment x, real part
    DmxReal,
    /// Dipole moment y, real part
    DmyReal,
    /// Dipole moment z, real part
    DmzReal,
    /// Dipole moment x, imaginary part
    DmxImag,
    /// Dipole moment y, imaginary part
    DmyImag,
    /// Dipole moment z, imaginary part
    DmzImag,
}

impl MatrixKind {
    /// All matrix sections in serialization order.
    pub const ALL: [MatrixKind; 8] = [
        MatrixKind::SocReal,
        MatrixKind::SocImag,
        MatrixKind::DmxReal,
        MatrixKind::DmyReal,
        MatrixKind::DmzReal,
        MatrixKind::DmxImag,
        MatrixKind::DmyImag,
        MatrixKind::DmzImag,
    ];

    /// Section keyword as written in templates.
    pub fn keyword(self) -> &'static str {
        match self {
            MatrixKind::SocReal => "SOC R",
            MatrixKind::SocImag => "SOC I",
            MatrixKind::DmxReal => "DMX R",
            MatrixKind::DmyReal => "DMY R",
            MatrixKind::DmzReal => "DMZ R",
            MatrixKind::DmxImag => "DMX I",
            MatrixKind::DmyImag => "DMY I",
            MatrixKind::DmzImag => "DMZ I",
        }
    }

    fn detect(line: &str) -> Option<Self> {
        let upper = line.to_uppercase();
        Self::ALL.into_iter().find(|kind| upper.contains(kind.keyword()))
    }
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Energy offset of one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epsilon {
    /// Multiplicity (1-based)
    pub mult: usize,
    /// State index within the multiplicity (1-based)
    pub state: usize,
    /// Energy offset
    pub energy: f64,
}

/// Linear coupling of one state along one normal mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kappa {
    /// Multiplicity (1-based)
    pub mult: usize,
    /// State index within the multiplicity (1-based)
    pub state: usize,
    /// Normal mode index
    pub mode: usize,
    /// Coupling coefficient
    pub value: f64,
}

/// Linear coupling between two states of one multiplicity along one mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lambda {
    /// Multiplicity (1-based)
    pub mult: usize,
    /// First state index (1-based)
    pub state1: usize,
    /// Second state index (1-based)
    pub state2: usize,
    /// Normal mode index
    pub mode: usize,
    /// Coupling coefficient
    pub value: f64,
}

/// Map from `(multiplicity, sublevel, state)` to the row/column index used by
/// every matrix term.
///
/// Multiplicities are packed one after another. Inside the block of
/// multiplicity `m`, each of its `m` magnetic sublevels holds all `states[m]`
/// states contiguously. With `states = [2, 0, 1]` the singlets occupy flat
/// indices 0 and 1 and the three triplet sublevels of the single triplet state
/// occupy 2, 3 and 4.
#[derive(Debug, Clone, PartialEq)]
pub struct StateIndexMap {
    states: Vec<usize>,
    flat: HashMap<(usize, usize, usize), usize>,
    size: usize,
}

impl StateIndexMap {
    /// Builds the map for the given per-multiplicity state counts.
    pub fn new(states: &[usize]) -> Self {
        let mut flat = HashMap::new();
        let mut offset = 0;
        for (m, &count) in states.iter().enumerate() {
            let mult = m + 1;
            for sublevel in 0..mult {
                for state in 1..=count {
                    flat.insert((mult, sublevel, state), offset + sublevel * count + state - 1);
                }
            }
            offset += count * mult;
        }

        Self {
            states: states.to_vec(),
            flat,
            size: offset,
        }
    }

    /// Flat index of a state sublevel, or `None` outside the universe.
    ///
    /// `mult` and `state` are 1-based, `sublevel` is 0-based.
    pub fn flat_index(&self, mult: usize, sublevel: usize, state: usize) -> Option<usize> {
        self.flat.get(&(mult, sublevel, state)).copied()
    }

    /// Flat indices of every sublevel of one state.
    pub fn sublevels(&self, mult: usize, state: usize) -> Vec<usize> {
        (0..mult)
            .filter_map(|sublevel| self.flat_index(mult, sublevel, state))
            .collect()
    }

    /// Total number of flat indices (`nr_states`).
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true when the map holds no state at all.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Per-multiplicity state counts the map was built from.
    pub fn states(&self) -> &[usize] {
        &self.states
    }
}

/// A linear vibronic coupling Hamiltonian.
///
/// Instances are immutable once built: parsing produces one and every
/// reduction produces a brand new one (see [`crate::reducer`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Hamiltonian {
    reference: String,
    states: Vec<usize>,
    used_modes: BTreeSet<usize>,
    epsilon: Vec<Epsilon>,
    kappa: Vec<Kappa>,
    lambda: Vec<Lambda>,
    matrices: BTreeMap<MatrixKind, DMatrix<f64>>,
    index_map: StateIndexMap,
}

impl Hamiltonian {
    /// Builds a Hamiltonian from its parts, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Inconsistent`] when a linear row references a
    /// state outside `states` or a matrix is not `nr_states × nr_states`.
    pub fn new(
        reference: String,
        states: Vec<usize>,
        epsilon: Vec<Epsilon>,
        kappa: Vec<Kappa>,
        lambda: Vec<Lambda>,
        matrices: BTreeMap<MatrixKind, DMatrix<f64>>,
    ) -> Result<Self> {
        let hamiltonian = Self::assemble(reference, states, epsilon, kappa, lambda, matrices);
        hamiltonian.validate()?;
        Ok(hamiltonian)
    }

    /// Builds a Hamiltonian whose invariants the caller already guarantees.
    pub(crate) fn assemble(
        reference: String,
        states: Vec<usize>,
        epsilon: Vec<Epsilon>,
        kappa: Vec<Kappa>,
        lambda: Vec<Lambda>,
        matrices: BTreeMap<MatrixKind, DMatrix<f64>>,
    ) -> Self {
        let used_modes = kappa
            .iter()
            .map(|k| k.mode)
            .chain(lambda.iter().map(|l| l.mode))
            .collect();
        let index_map = StateIndexMap::new(&states);

        Self {
            reference,
            states,
            used_modes,
            epsilon,
            kappa,
            lambda,
            matrices,
            index_map,
        }
    }

    /// Reads and parses an `LVC.template` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = read_text(path)?;
        Self::parse(&content)
    }

    /// Parses the template text format.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Malformed`] when a header field is missing or
    /// non-numeric, a declared section is shorter than its stated or implied
    /// length, a data row is incomplete or non-numeric, or a row references a
    /// state outside the header's universe. Nothing partial is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use lvcgym::hamiltonian::Hamiltonian;
    ///
    /// let text = "v0.txt\n2 0 1\nepsilon\n1\n  1   1  0.0\nkappa\n0\nlambda\n0\n";
    /// let h = Hamiltonian::parse(text)?;
    /// assert_eq!(h.nr_states(), 5);
    /// # Ok::<(), lvcgym::hamiltonian::TemplateError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();

        let reference = lines
            .first()
            .ok_or_else(|| malformed(1, "missing reference energy line"))?
            .trim()
            .to_string();
        let counts_line = lines
            .get(1)
            .ok_or_else(|| malformed(2, "missing state count line"))?;
        let states = counts_line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<usize>()
                    .map_err(|_| malformed(2, format!("invalid state count '{}'", token)))
            })
            .collect::<Result<Vec<usize>>>()?;
        if states.is_empty() {
            return Err(malformed(2, "no state counts given"));
        }

        let nr_states: usize = states.iter().enumerate().map(|(m, n)| n * (m + 1)).sum();
        debug!("Template header: states {:?}, nr_states {}", states, nr_states);

        let mut epsilon = Vec::new();
        let mut kappa = Vec::new();
        let mut lambda = Vec::new();
        let mut matrices = BTreeMap::new();

        let mut cursor = 2;
        while cursor < lines.len() {
            if let Some(kind) = LinearKind::detect(lines[cursor]) {
                let count = parse_count(&lines, cursor + 1, kind)?;
                let first_row = cursor + 2;
                let rows = section_rows(&lines, first_row, count, kind.keyword())?;
                debug!("Section {} with {} rows", kind.keyword(), count);

                match kind {
                    LinearKind::Epsilon => {
                        epsilon = rows
                            .iter()
                            .enumerate()
                            .map(|(i, row)| parse_epsilon(row, first_row + i + 1, &states))
                            .collect::<Result<_>>()?;
                    }
                    LinearKind::Kappa => {
                        kappa = rows
                            .iter()
                            .enumerate()
                            .map(|(i, row)| parse_kappa(row, first_row + i + 1, &states))
                            .collect::<Result<_>>()?;
                    }
                    LinearKind::Lambda => {
                        lambda = rows
                            .iter()
                            .enumerate()
                            .map(|(i, row)| parse_lambda(row, first_row + i + 1, &states))
                            .collect::<Result<_>>()?;
                    }
                }
                cursor = first_row + count;
                continue;
            }

            if let Some(kind) = MatrixKind::detect(lines[cursor]) {
                let first_row = cursor + 1;
                let rows = section_rows(&lines, first_row, nr_states, kind.keyword())?;
                let matrix = parse_matrix(rows, first_row + 1, nr_states)?;
                debug!("Section {} with {}x{} entries", kind, nr_states, nr_states);
                matrices.insert(kind, matrix);
                cursor = first_row + nr_states;
                continue;
            }

            cursor += 1;
        }

        Ok(Self::assemble(reference, states, epsilon, kappa, lambda, matrices))
    }

    /// Renders the Hamiltonian in the template text format.
    ///
    /// The three linear sections are always written (with count 0 when
    /// empty); matrix sections only when present, in [`MatrixKind::ALL`]
    /// order. Linear coefficients use 5 mantissa decimals, matrix entries 7.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.reference);
        out.push('\n');
        let counts: Vec<String> = self.states.iter().map(|n| n.to_string()).collect();
        out.push_str(&counts.join(" "));
        out.push('\n');

        out.push_str(&format!("epsilon\n{}\n", self.epsilon.len()));
        for e in &self.epsilon {
            out.push_str(&format!(
                "  {}   {} {}\n",
                e.mult,
                e.state,
                format_scientific(e.energy, 5)
            ));
        }

        out.push_str(&format!("kappa\n{}\n", self.kappa.len()));
        for k in &self.kappa {
            out.push_str(&format!(
                "  {}   {}     {} {}\n",
                k.mult,
                k.state,
                k.mode,
                format_scientific(k.value, 5)
            ));
        }

        out.push_str(&format!("lambda\n{}\n", self.lambda.len()));
        for l in &self.lambda {
            out.push_str(&format!(
                "  {}   {}   {}   {} {}\n",
                l.mult,
                l.state1,
                l.state2,
                l.mode,
                format_scientific(l.value, 5)
            ));
        }

        for (kind, matrix) in &self.matrices {
            out.push_str(kind.keyword());
            out.push('\n');
            for row in matrix.row_iter() {
                for value in row.iter() {
                    out.push_str(&format_scientific(*value, 7));
                    out.push(' ');
                }
                out.push('\n');
            }
        }

        out
    }

    /// Checks every structural invariant.
    pub fn validate(&self) -> Result<()> {
        let check = |mult: usize, state: usize, what: &str| -> Result<()> {
            if state_in_universe(&self.states, mult, state) {
                Ok(())
            } else {
                Err(TemplateError::Inconsistent(format!(
                    "{} row references state {} of multiplicity {}",
                    what, state, mult
                )))
            }
        };

        for e in &self.epsilon {
            check(e.mult, e.state, "epsilon")?;
        }
        for k in &self.kappa {
            check(k.mult, k.state, "kappa")?;
        }
        for l in &self.lambda {
            check(l.mult, l.state1, "lambda")?;
            check(l.mult, l.state2, "lambda")?;
        }

        let n = self.nr_states();
        for (kind, matrix) in &self.matrices {
            if matrix.nrows() != n || matrix.ncols() != n {
                return Err(TemplateError::Inconsistent(format!(
                    "{} is {}x{}, expected {}x{}",
                    kind,
                    matrix.nrows(),
                    matrix.ncols(),
                    n,
                    n
                )));
            }
        }
        Ok(())
    }

    /// Reference-energy label (first template line).
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Number of states per multiplicity.
    pub fn states(&self) -> &[usize] {
        &self.states
    }

    /// Number of multiplicities in the header.
    pub fn multiplicities(&self) -> usize {
        self.states.len()
    }

    /// Number of multiplicities that hold at least one state.
    pub fn populated_multiplicities(&self) -> usize {
        self.states.iter().filter(|&&n| n > 0).count()
    }

    /// Total number of sublevel-resolved states (matrix dimension).
    pub fn nr_states(&self) -> usize {
        self.index_map.len()
    }

    /// Sorted set of modes referenced by any kappa or lambda row.
    pub fn used_modes(&self) -> &BTreeSet<usize> {
        &self.used_modes
    }

    /// Energy offsets.
    pub fn epsilon(&self) -> &[Epsilon] {
        &self.epsilon
    }

    /// Intra-state couplings.
    pub fn kappa(&self) -> &[Kappa] {
        &self.kappa
    }

    /// Inter-state couplings.
    pub fn lambda(&self) -> &[Lambda] {
        &self.lambda
    }

    /// One matrix term, if present in the template.
    pub fn matrix(&self, kind: MatrixKind) -> Option<&DMatrix<f64>> {
        self.matrices.get(&kind)
    }

    /// All present matrix terms in serialization order.
    pub fn matrices(&self) -> &BTreeMap<MatrixKind, DMatrix<f64>> {
        &self.matrices
    }

    /// Precomputed flat index map for the matrix terms.
    pub fn index_map(&self) -> &StateIndexMap {
        &self.index_map
    }
}

pub(crate) fn state_in_universe(states: &[usize], mult: usize, state: usize) -> bool {
    mult >= 1 && mult <= states.len() && state >= 1 && state <= states[mult - 1]
}

fn parse_count(lines: &[&str], index: usize, kind: LinearKind) -> Result<usize> {
    let line = lines.get(index).ok_or_else(|| {
        malformed(
            index + 1,
            format!("missing entry count after '{}'", kind.keyword()),
        )
    })?;
    let token = line.split_whitespace().next().unwrap_or("");
    token.parse::<usize>().map_err(|_| {
        malformed(
            index + 1,
            format!("invalid entry count '{}' for '{}'", token, kind.keyword()),
        )
    })
}

fn section_rows<'a>(
    lines: &'a [&'a str],
    start: usize,
    count: usize,
    keyword: &str,
) -> Result<&'a [&'a str]> {
    if start + count > lines.len() {
        return Err(malformed(
            lines.len() + 1,
            format!(
                "section '{}' declares {} rows but only {} remain",
                keyword,
                count,
                lines.len().saturating_sub(start)
            ),
        ));
    }
    Ok(&lines[start..start + count])
}

fn fields<'a>(row: &'a str, expected: usize, line: usize, section: &str) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = row.split_whitespace().collect();
    if parts.len() < expected {
        return Err(malformed(
            line,
            format!(
                "{} row needs {} fields, found {}",
                section,
                expected,
                parts.len()
            ),
        ));
    }
    Ok(parts)
}

fn parse_index(token: &str, line: usize, what: &str) -> Result<usize> {
    token
        .parse::<usize>()
        .map_err(|_| malformed(line, format!("invalid {} '{}'", what, token)))
}

fn parse_value(token: &str, line: usize) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| malformed(line, format!("invalid number '{}'", token)))
}

fn check_state(states: &[usize], mult: usize, state: usize, line: usize) -> Result<()> {
    if state_in_universe(states, mult, state) {
        Ok(())
    } else {
        Err(malformed(
            line,
            format!(
                "state {} of multiplicity {} is outside the header's state counts {:?}",
                state, mult, states
            ),
        ))
    }
}

fn parse_epsilon(row: &str, line: usize, states: &[usize]) -> Result<Epsilon> {
    let parts = fields(row, 3, line, "epsilon")?;
    let mult = parse_index(parts[0], line, "multiplicity")?;
    let state = parse_index(parts[1], line, "state")?;
    check_state(states, mult, state, line)?;
    Ok(Epsilon {
        mult,
        state,
        energy: parse_value(parts[2], line)?,
    })
}

fn parse_kappa(row: &str, line: usize, states: &[usize]) -> Result<Kappa> {
    let parts = fields(row, 4, line, "kappa")?;
    let mult = parse_index(parts[0], line, "multiplicity")?;
    let state = parse_index(parts[1], line, "state")?;
    check_state(states, mult, state, line)?;
    Ok(Kappa {
        mult,
        state,
        mode: parse_index(parts[2], line, "mode")?,
        value: parse_value(parts[3], line)?,
    })
}

fn parse_lambda(row: &str, line: usize, states: &[usize]) -> Result<Lambda> {
    let parts = fields(row, 5, line, "lambda")?;
    let mult = parse_index(parts[0], line, "multiplicity")?;
    let state1 = parse_index(parts[1], line, "state")?;
    let state2 = parse_index(parts[2], line, "state")?;
    check_state(states, mult, state1, line)?;
    check_state(states, mult, state2, line)?;
    Ok(Lambda {
        mult,
        state1,
        state2,
        mode: parse_index(parts[3], line, "mode")?,
        value: parse_value(parts[4], line)?,
    })
}

fn parse_matrix(rows: &[&str], first_line: usize, n: usize) -> Result<DMatrix<f64>> {
    let mut values = Vec::with_capacity(n * n);
    for (i, row) in rows.iter().enumerate() {
        let line = first_line + i;
        let parts: Vec<&str> = row.split_whitespace().collect();
        if parts.len() != n {
            return Err(malformed(
                line,
                format!("matrix row has {} values, expected {}", parts.len(), n),
            ));
        }
        for token in parts {
            values.push(parse_value(token, line)?);
        }
    }
    Ok(DMatrix::from_row_slice(n, n, &values))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "v0.txt
2 0 1
epsilon
3
  1   1  0.00000e+00
  1   2  1.20000e-01
  3   1  8.00000e-02
kappa
2
  1   2     7  1.00000e-03
  3   1     9 -2.50000e-03
lambda
1
  1   1   2   9  2.00000e-03
SOC R
 1.0  2.0  3.0  4.0  5.0
 6.0  7.0  8.0  9.0 10.0
11.0 12.0 13.0 14.0 15.0
16.0 17.0 18.0 19.0 20.0
21.0 22.0 23.0 24.0 25.0
";

    #[test]
    fn test_state_index_map_packs_sublevels() {
        let map = StateIndexMap::new(&[2, 0, 1]);
        assert_eq!(map.len(), 5);
        assert_eq!(map.flat_index(1, 0, 1), Some(0));
        assert_eq!(map.flat_index(1, 0, 2), Some(1));
        assert_eq!(map.sublevels(3, 1), vec![2, 3, 4]);
        assert_eq!(map.flat_index(2, 0, 1), None);
    }

    #[test]
    fn test_state_index_map_blocks_do_not_overlap() {
        let map = StateIndexMap::new(&[1, 1, 1]);
        assert_eq!(map.len(), 6);
        assert_eq!(map.sublevels(1, 1), vec![0]);
        assert_eq!(map.sublevels(2, 1), vec![1, 2]);
        assert_eq!(map.sublevels(3, 1), vec![3, 4, 5]);
    }

    #[test]
    fn test_parse_template() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        assert_eq!(h.reference(), "v0.txt");
        assert_eq!(h.states(), &[2, 0, 1]);
        assert_eq!(h.nr_states(), 5);
        assert_eq!(h.epsilon().len(), 3);
        assert_eq!(h.kappa()[1].value, -2.5e-3);
        assert_eq!(h.lambda()[0].state2, 2);
        assert_eq!(h.used_modes().iter().copied().collect::<Vec<_>>(), vec![7, 9]);

        let soc = h.matrix(MatrixKind::SocReal).unwrap();
        assert_eq!(soc.shape(), (5, 5));
        assert_eq!(soc[(1, 3)], 9.0);
        assert!(h.matrix(MatrixKind::DmxReal).is_none());
    }

    #[test]
    fn test_keywords_match_as_case_insensitive_substrings() {
        let text = "v0\n1\n  Epsilon section\n1\n  1   1  0.5\nsoc r\n 0.25\n";
        let h = Hamiltonian::parse(text).unwrap();
        assert_eq!(h.epsilon()[0].energy, 0.5);
        assert_eq!(h.matrix(MatrixKind::SocReal).unwrap()[(0, 0)], 0.25);
    }

    #[test]
    fn test_missing_linear_sections_are_empty() {
        let h = Hamiltonian::parse("v0\n1 1\n").unwrap();
        assert!(h.epsilon().is_empty());
        assert!(h.kappa().is_empty());
        assert!(h.used_modes().is_empty());
        assert_eq!(h.nr_states(), 3);
    }

    #[test]
    fn test_non_numeric_header_is_rejected() {
        let err = Hamiltonian::parse("v0\n2 x 1\n").unwrap_err();
        assert!(matches!(err, TemplateError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_missing_header_is_rejected() {
        assert!(matches!(
            Hamiltonian::parse("v0\n"),
            Err(TemplateError::Malformed { line: 2, .. })
        ));
        assert!(Hamiltonian::parse("").is_err());
    }

    #[test]
    fn test_short_linear_section_is_rejected() {
        let text = "v0\n2\nkappa\n3\n  1   1   4  0.1\n";
        assert!(matches!(
            Hamiltonian::parse(text),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn test_short_matrix_section_is_rejected() {
        let text = "v0\n2\nDMX R\n 0.0 0.0\n";
        assert!(matches!(
            Hamiltonian::parse(text),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn test_matrix_row_with_wrong_width_is_rejected() {
        let text = "v0\n2\nDMX R\n 0.0 0.0\n 0.0\n";
        let err = Hamiltonian::parse(text).unwrap_err();
        assert!(matches!(err, TemplateError::Malformed { line: 5, .. }));
    }

    #[test]
    fn test_row_outside_state_universe_is_rejected() {
        let text = "v0\n1 0\nepsilon\n1\n  2   1  0.0\n";
        let err = Hamiltonian::parse(text).unwrap_err();
        assert!(matches!(err, TemplateError::Malformed { line: 5, .. }));
    }

    #[test]
    fn test_serialize_layout() {
        let h = Hamiltonian::parse(TEMPLATE).unwrap();
        let text = h.serialize();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "v0.txt");
        assert_eq!(lines[1], "2 0 1");
        assert_eq!(lines[2], "epsilon");
        assert_eq!(lines[3], "3");
        assert_eq!(lines[5], "  1   2  1.20000e-01");
        assert_eq!(lines[8], "2");
        assert_eq!(lines[10], "  3   1     9 -2.50000e-03");
        assert_eq!(lines[13], "  1   1   2   9  2.00000e-03");
        assert_eq!(lines[14], "SOC R");
        assert!(lines[15].starts_with(" 1.0000000e+00  2.0000000e+00"));
    }

    #[test]
    fn test_serialize_writes_empty_linear_sections() {
        let h = Hamiltonian::parse("v0\n1\n").unwrap();
        assert_eq!(h.serialize(), "v0\n1\nepsilon\n0\nkappa\n0\nlambda\n0\n");
    }

    #[test]
    fn test_new_rejects_wrong_matrix_shape() {
        let mut matrices = BTreeMap::new();
        matrices.insert(MatrixKind::DmzImag, DMatrix::zeros(2, 2));
        let result = Hamiltonian::new("v0".into(), vec![1], vec![], vec![], vec![], matrices);
        assert!(matches!(result, Err(TemplateError::Inconsistent(_))));
    }
}
