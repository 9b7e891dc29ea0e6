//! Directory and file naming for the loop outputs.
//!
//! Every name written by a sweep is produced here, so the analysis side can
//! rely on a single convention.
//!
//! # Example
//!
//! ```
//! use lvcgym::naming::combination_dir_name;
//! use lvcgym::selection::RemovedParameters;
//!
//! let removed = RemovedParameters {
//!     modes: vec![7, 9],
//!     states: vec![vec![2], vec![], vec![1]],
//! };
//! assert_eq!(combination_dir_name(&removed), "mminus_7-9_sminus_2_0_1");
//! ```

use crate::parameter_space::{ParameterPoint, Representation, ScreeningOption};
use crate::selection::{join, RemovedParameters};
use crate::settings::OutputSettings;
use std::path::{Path, PathBuf};

/// Name of a Hamiltonian loop directory.
///
/// Format: `mminus_<removed modes>_sminus_<removed states of mult 1>_..._<mult n>`
/// where each list is hyphen-joined and written `0` when empty.
pub fn combination_dir_name(removed: &RemovedParameters) -> String {
    let states: Vec<String> = removed.states.iter().map(|s| index_list(s)).collect();
    format!(
        "mminus_{}_sminus_{}",
        index_list(&removed.modes),
        states.join("_")
    )
}

/// Name of a parameter loop directory.
///
/// Format: `traj_<T|F><coupling><ekincorrect><reflect><decoherence><hopping>`,
/// `T` standing for the diagonal representation.
///
/// ```
/// use lvcgym::naming::trajectory_dir_name;
/// use lvcgym::parameter_space::{build_parameter_space, ScreeningRequest};
///
/// let point = build_parameter_space(&ScreeningRequest::default(), 2).unwrap()[0];
/// assert_eq!(trajectory_dir_name(&point), "traj_T32122");
/// ```
pub fn trajectory_dir_name(point: &ParameterPoint) -> String {
    let surf = match point.representation {
        Representation::Diagonal => 'T',
        Representation::Mch => 'F',
    };
    let codes: String = point.codes()[1..]
        .iter()
        .map(|code| code.to_string())
        .collect();
    format!("traj_{}{}", surf, codes)
}

fn index_list(values: &[usize]) -> String {
    if values.is_empty() {
        "0".to_string()
    } else {
        join(values, "-")
    }
}

/// File locations inside a loop directory tree.
#[derive(Debug, Clone)]
pub struct OutputNaming {
    root: PathBuf,
    files: OutputSettings,
}

impl OutputNaming {
    /// Creates the naming for a loop rooted at `root`.
    pub fn new(root: &Path, files: &OutputSettings) -> Self {
        Self {
            root: root.to_path_buf(),
            files: files.clone(),
        }
    }

    /// Loop root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one combination or trajectory.
    pub fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Reference template at the loop root.
    pub fn root_template(&self) -> PathBuf {
        self.root.join(&self.files.template_file)
    }

    /// List of created directories at the loop root.
    pub fn directory_list(&self) -> PathBuf {
        self.root.join(&self.files.directory_list)
    }

    /// Template inside `dir`.
    pub fn template(&self, dir: &Path) -> PathBuf {
        dir.join(&self.files.template_file)
    }

    /// Removed-parameter record inside `dir`.
    pub fn sidecar(&self, dir: &Path) -> PathBuf {
        dir.join(&self.files.sidecar_file)
    }

    /// Molden copy inside `dir`.
    pub fn molden(&self, dir: &Path) -> PathBuf {
        dir.join(&self.files.molden_file)
    }

    /// Trajectory option record inside `dir`.
    pub fn parameters(&self, dir: &Path) -> PathBuf {
        dir.join(&self.files.parameters_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_space::{build_parameter_space, AxisChoice, ScreeningRequest};

    #[test]
    fn test_unchanged_combination_name() {
        let removed = RemovedParameters {
            modes: vec![],
            states: vec![vec![], vec![]],
        };
        assert_eq!(combination_dir_name(&removed), "mminus_0_sminus_0_0");
    }

    #[test]
    fn test_names_do_not_collide() {
        let a = RemovedParameters {
            modes: vec![1, 23],
            states: vec![vec![]],
        };
        let b = RemovedParameters {
            modes: vec![12, 3],
            states: vec![vec![]],
        };
        assert_ne!(combination_dir_name(&a), combination_dir_name(&b));
    }

    #[test]
    fn test_mch_trajectory_name() {
        let request = ScreeningRequest {
            representation: AxisChoice::Fixed(2),
            decoherence: AxisChoice::Fixed(3),
            ..ScreeningRequest::default()
        };
        let point = build_parameter_space(&request, 2).unwrap()[0];
        assert_eq!(trajectory_dir_name(&point), "traj_F32132");
    }

    #[test]
    fn test_output_paths() {
        let naming = OutputNaming::new(Path::new("run/hamiltonian_loop"), &OutputSettings::default());
        let dir = naming.dir("mminus_0_sminus_1");
        assert_eq!(naming.root_template(), Path::new("run/hamiltonian_loop/LVC.template"));
        assert_eq!(
            naming.sidecar(&dir),
            Path::new("run/hamiltonian_loop/mminus_0_sminus_1/changed_parameters")
        );
        assert_eq!(
            naming.directory_list(),
            Path::new("run/hamiltonian_loop/setup_directories")
        );
    }
}
