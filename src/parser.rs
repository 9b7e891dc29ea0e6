//! Input file parsing for lvcgym.
//!
//! A gym input file (by convention `lvcgym.in`) holds one keyword per line
//! followed by its values. `#` starts a comment, keywords are
//! case-insensitive, and an optional `=` may separate keyword and values.
//!
//! ```text
//! # Hamiltonian loop removing up to two modes
//! template        LVC.template
//! molden          V0.molden
//! loop            hamiltonian
//! mode_selector   depth 2
//! state_selector  all
//! keep_states     1:1 3:1
//! output_dir      .
//! overwrite       false
//! ```
//!
//! The parameter loop takes the six screening keywords instead, each with one
//! code or a list of codes to screen (`a~b` expands to every code from `a` to
//! `b`):
//!
//! ```text
//! loop            parameter
//! representation  1 2
//! coupling        2 3
//! ekincorrect     2
//! reflect         1
//! decoherence     1~3
//! hopping         2
//! ```
//!
//! When a keyword appears more than once the first occurrence wins; later ones
//! are reported and ignored. Unknown keywords are reported and ignored.

use crate::config::{GymConfig, LoopKind, Selector};
use crate::parameter_space::AxisChoice;
use crate::selection::StatePin;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for parsing operations.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O error when reading files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Parse error with descriptive message
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },
}

/// Type alias for parse operation results
type Result<T> = std::result::Result<T, ParseError>;

lazy_static! {
    // "keyword value value ..." or "keyword = value ..."
    static ref KEYWORD_RE: Regex = Regex::new(r"^\s*([A-Za-z_]+)\s*=?\s*(.*?)\s*$").unwrap();

    // Inclusive integer range: "3~7"
    static ref RANGE_RE: Regex = Regex::new(r"^(\d+)~(\d+)$").unwrap();

    // Pinned state: "mult:index"
    static ref PIN_RE: Regex = Regex::new(r"^(\d+):(\d+)$").unwrap();
}

/// Keywords understood by [`parse_input_str`].
pub const KEYWORDS: [&str; 14] = [
    "template",
    "molden",
    "loop",
    "mode_selector",
    "state_selector",
    "keep_states",
    "output_dir",
    "overwrite",
    "representation",
    "coupling",
    "ekincorrect",
    "reflect",
    "decoherence",
    "hopping",
];

/// Parse a gym input file.
///
/// Relative `template`, `molden` and `output_dir` paths are resolved against
/// the directory holding the input file.
///
/// # Arguments
///
/// * `path` - Path to the input file (e.g., "lvcgym.in")
///
/// # Returns
///
/// Returns `Ok(GymConfig)` on successful parsing, or `Err(ParseError)` if the
/// file cannot be read or a keyword carries an invalid value.
pub fn parse_input(path: &Path) -> Result<GymConfig> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_input_str(&content)?;

    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        config.template = resolve(base, &config.template);
        config.molden = config.molden.as_ref().map(|m| resolve(base, m));
        config.output_dir = resolve(base, &config.output_dir);
    }
    Ok(config)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Parse gym input text into a configuration.
///
/// # Examples
///
/// ```
/// use lvcgym::config::{LoopKind, Selector};
/// use lvcgym::parser::parse_input_str;
///
/// let config = parse_input_str("loop 1\nmode_selector depth 2\n")?;
/// assert_eq!(config.loop_kind, LoopKind::Hamiltonian);
/// assert_eq!(config.mode_selector, Selector::Depth(2));
/// # Ok::<(), lvcgym::parser::ParseError>(())
/// ```
pub fn parse_input_str(content: &str) -> Result<GymConfig> {
    let mut config = GymConfig::default();
    let mut seen = HashSet::new();

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some(caps) = KEYWORD_RE.captures(line) else {
            warn!("Line {}: cannot read '{}', ignoring it", line_no, line);
            continue;
        };
        let keyword = caps[1].to_lowercase();
        let value = caps.get(2).map_or("", |m| m.as_str());

        if !KEYWORDS.contains(&keyword.as_str()) {
            warn!("Line {}: unknown keyword '{}' ignored", line_no, keyword);
            continue;
        }
        if !seen.insert(keyword.clone()) {
            warn!(
                "Line {}: keyword '{}' given more than once, keeping the first value",
                line_no, keyword
            );
            continue;
        }

        debug!("Line {}: {} = '{}'", line_no, keyword, value);
        parse_keyword(&keyword, value, line_no, &mut config)?;
    }

    Ok(config)
}

fn parse_keyword(keyword: &str, value: &str, line: usize, config: &mut GymConfig) -> Result<()> {
    match keyword {
        "template" => config.template = PathBuf::from(require(value, keyword, line)?),
        "molden" => config.molden = Some(PathBuf::from(require(value, keyword, line)?)),
        "output_dir" => config.output_dir = PathBuf::from(require(value, keyword, line)?),
        "loop" => config.loop_kind = parse_loop(value, line)?,
        "mode_selector" => config.mode_selector = parse_selector(value, line)?,
        "state_selector" => config.state_selector = parse_selector(value, line)?,
        "keep_states" => config.keep_states = parse_pins(value, line)?,
        "overwrite" => config.overwrite = Some(parse_bool(value, line)?),
        "representation" => config.screening.representation = parse_axis(value, line)?,
        "coupling" => config.screening.coupling = parse_axis(value, line)?,
        "ekincorrect" => config.screening.ekin_correct = parse_axis(value, line)?,
        "reflect" => config.screening.reflect = parse_axis(value, line)?,
        "decoherence" => config.screening.decoherence = parse_axis(value, line)?,
        "hopping" => config.screening.hopping = parse_axis(value, line)?,
        _ => {}
    }
    Ok(())
}

fn error(line: usize, message: String) -> ParseError {
    ParseError::Parse { line, message }
}

fn require<'a>(value: &'a str, keyword: &str, line: usize) -> Result<&'a str> {
    if value.is_empty() {
        Err(error(line, format!("keyword '{}' needs a value", keyword)))
    } else {
        Ok(value)
    }
}

fn parse_loop(value: &str, line: usize) -> Result<LoopKind> {
    match value.to_lowercase().as_str() {
        "1" | "hamiltonian" => Ok(LoopKind::Hamiltonian),
        "2" | "parameter" => Ok(LoopKind::Parameter),
        other => Err(error(
            line,
            format!("unknown loop '{}' (use hamiltonian/1 or parameter/2)", other),
        )),
    }
}

fn parse_selector(value: &str, line: usize) -> Result<Selector> {
    let tokens: Vec<String> = value.split_whitespace().map(str::to_lowercase).collect();
    match tokens.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["none"] => Ok(Selector::None),
        ["all"] => Ok(Selector::All),
        ["depth", n] => n
            .parse()
            .map(Selector::Depth)
            .map_err(|_| error(line, format!("invalid depth '{}'", n))),
        _ => Err(error(
            line,
            format!("invalid selector '{}' (use none, all or depth N)", value),
        )),
    }
}

fn parse_bool(value: &str, line: usize) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(error(line, format!("invalid boolean '{}'", other))),
    }
}

fn parse_pins(value: &str, line: usize) -> Result<Vec<StatePin>> {
    value
        .split_whitespace()
        .map(|token| {
            let caps = PIN_RE
                .captures(token)
                .ok_or_else(|| error(line, format!("invalid state '{}' (use mult:index)", token)))?;
            let number = |i: usize| {
                caps[i]
                    .parse::<usize>()
                    .map_err(|_| error(line, format!("invalid state '{}'", token)))
            };
            Ok(StatePin {
                mult: number(1)?,
                state: number(2)?,
            })
        })
        .collect()
}

/// Expands integer tokens and `a~b` ranges into a list.
pub fn parse_int_list(value: &str) -> std::result::Result<Vec<usize>, String> {
    let mut values = Vec::new();
    for token in value.split_whitespace() {
        if let Some(caps) = RANGE_RE.captures(token) {
            let start: usize = caps[1].parse().map_err(|_| token.to_string())?;
            let end: usize = caps[2].parse().map_err(|_| token.to_string())?;
            if start > end {
                return Err(token.to_string());
            }
            values.extend(start..=end);
        } else {
            values.push(token.parse().map_err(|_| token.to_string())?);
        }
    }
    Ok(values)
}

fn parse_axis(value: &str, line: usize) -> Result<AxisChoice> {
    let codes = parse_int_list(value)
        .map_err(|token| error(line, format!("invalid option code '{}'", token)))?
        .into_iter()
        .map(|code| {
            u8::try_from(code).map_err(|_| error(line, format!("invalid option code '{}'", code)))
        })
        .collect::<Result<Vec<u8>>>()?;
    Ok(AxisChoice::from_codes(codes))
}
