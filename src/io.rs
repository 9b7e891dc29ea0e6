//! Text formatting and file utilities for LVC templates and sidecar files.
//!
//! This module owns every piece of number formatting used when a Hamiltonian
//! is rendered back to text, and the all-or-nothing file writer used for every
//! artifact the sweeps produce.

use std::fs;
use std::io::{Result, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Formats a value in signed scientific notation with a two-digit exponent.
///
/// Non-negative values get a leading space and negative values a leading
/// minus, so columns line up. The mantissa carries `decimals` digits after the
/// decimal point and the exponent always has an explicit sign and at least two
/// digits (`1.5e-3` is written ` 1.5000000e-03` with 7 decimals).
///
/// # Examples
///
/// ```
/// use lvcgym::io::format_scientific;
///
/// assert_eq!(format_scientific(0.0015, 7), " 1.5000000e-03");
/// assert_eq!(format_scientific(-250.0, 5), "-2.50000e+02");
/// ```
pub fn format_scientific(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let sign = if value.is_sign_negative() { '-' } else { ' ' };
    let raw = format!("{:.*e}", decimals, value.abs());
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let exp_sign = if exponent < 0 { '-' } else { '+' };

    format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exponent.abs())
}

/// Writes `content` to `path` atomically.
///
/// The text is written to a temporary file in the destination directory and
/// then renamed over `path`, so readers never observe a partially written
/// file.
///
/// # Examples
///
/// ```
/// use lvcgym::io::write_atomic;
/// use std::path::Path;
///
/// fn main() -> std::io::Result<()> {
///     write_atomic(Path::new("LVC.template.demo"), "label\n1\n")?;
///     std::fs::remove_file("LVC.template.demo")?;
///     Ok(())
/// }
/// ```
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Reads a whole text file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_scientific_matches_printf_style() {
        assert_eq!(format_scientific(1.0, 7), " 1.0000000e+00");
        assert_eq!(format_scientific(-0.000123456, 5), "-1.23456e-04");
        assert_eq!(format_scientific(0.0, 5), " 0.00000e+00");
        assert_eq!(format_scientific(1.0e120, 2), " 1.00e+120");
    }

    #[test]
    fn test_format_scientific_negative_zero_keeps_sign() {
        assert_eq!(format_scientific(-0.0, 3), "-0.000e+00");
    }

    #[test]
    fn test_write_atomic_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("LVC.template");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        // No stray temporary files are left behind
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
