//! Hamiltonian and parameter loops.
//!
//! A sweep writes one directory per combination under the loop root and
//! records every directory it completed in the directory list. Malformed
//! input stops the run before anything is written; a combination that fails
//! on its own (invalid selection, unwritable directory) is logged, left out of
//! the directory list, and the enumeration goes on.

use crate::combinations::{mode_combinations, state_combinations};
use crate::config::{GymConfig, LoopKind};
use crate::hamiltonian::{Hamiltonian, TemplateError};
use crate::io::{read_text, write_atomic};
use crate::molden::zero_frequencies;
use crate::naming::{combination_dir_name, trajectory_dir_name, OutputNaming};
use crate::parameter_space::{build_parameter_space, OptionError, ParameterPoint};
use crate::reducer::reduce;
use crate::selection::{
    full_state_selection, total_states, ModeSelection, RemovedParameters, SelectionError,
    StateSelection,
};
use crate::settings::Settings;
use crate::validation::log_file_operation;
use crate::workspace::{prepare_directory, OverwritePolicy, WorkspaceError};
use log::{debug, error, info};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by a sweep.
#[derive(Error, Debug)]
pub enum SweepError {
    /// I/O error while reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Reference template could not be used
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    /// A selection does not fit the Hamiltonian
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
    /// The screening request is unusable
    #[error("Option error: {0}")]
    Option(#[from] OptionError),
    /// An output directory could not be prepared
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
    /// A JSON record could not be written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, SweepError>;

/// Everything a sweep needs, decided once per run.
pub struct SweepContext<'a> {
    /// Parsed gym input
    pub config: &'a GymConfig,
    /// Full reference Hamiltonian
    pub reference: &'a Hamiltonian,
    /// Output locations under the loop root
    pub naming: OutputNaming,
    /// Overwrite decision for every directory of the run
    pub policy: OverwritePolicy,
    /// Molden text, read once
    pub molden: Option<String>,
    /// Print level from the settings
    pub print_level: u32,
}

impl<'a> SweepContext<'a> {
    /// Builds the context, reading the molden file if one is configured.
    pub fn new(
        config: &'a GymConfig,
        reference: &'a Hamiltonian,
        settings: &Settings,
    ) -> Result<Self> {
        let molden = match &config.molden {
            Some(path) => Some(read_text(path)?),
            None => None,
        };
        Ok(Self {
            config,
            reference,
            naming: OutputNaming::new(&config.loop_root(), &settings.output),
            policy: config.overwrite_policy(settings.general.overwrite),
            molden,
            print_level: settings.general.print_level,
        })
    }

    fn write(&self, operation: &str, path: &Path, content: &str) -> Result<()> {
        write_atomic(path, content)?;
        log_file_operation(operation, path, self.print_level);
        Ok(())
    }
}

/// A combination that could not be written.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedCombination {
    /// Directory name of the combination
    pub name: String,
    /// Error that stopped it
    pub reason: String,
}

/// Outcome of a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Loop that was set up
    pub loop_kind: LoopKind,
    /// Loop root directory
    pub root: PathBuf,
    /// Completed directories, absolute, in enumeration order
    pub written: Vec<PathBuf>,
    /// Combinations left out of the directory list
    pub skipped: Vec<SkippedCombination>,
}

impl SweepReport {
    fn new(loop_kind: LoopKind, root: &Path) -> Self {
        Self {
            loop_kind,
            root: root.to_path_buf(),
            written: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn record(&mut self, name: String, outcome: Result<PathBuf>) {
        match outcome {
            Ok(dir) => self.written.push(dir),
            Err(e) => {
                error!("Skipping {}: {}", name, e);
                self.skipped.push(SkippedCombination {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Option record written into every parameter loop directory.
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryParameters {
    /// Trajectory directory name
    pub directory: String,
    /// Option codes in axis order
    pub codes: [u8; 6],
    /// Option names
    pub options: ParameterPoint,
    /// Decoherence parameter of the chosen scheme, if it takes one
    pub decoherence_parameter: Option<f64>,
}

/// Sets up the loop selected in the configuration.
pub fn run(ctx: &SweepContext) -> Result<SweepReport> {
    let report = match ctx.config.loop_kind {
        LoopKind::Hamiltonian => run_hamiltonian_loop(ctx)?,
        LoopKind::Parameter => run_parameter_loop(ctx)?,
    };
    info!(
        "Run summary:\n{}",
        serde_json::to_string_pretty(&report)?
    );
    Ok(report)
}

/// Writes one reduced Hamiltonian per (mode set, state set) combination.
///
/// The reference template goes to the loop root. Each combination directory
/// receives the reduced template, the removed-parameter sidecar and, when a
/// molden file is configured, a copy with the removed modes' frequencies set
/// to zero.
pub fn run_hamiltonian_loop(ctx: &SweepContext) -> Result<SweepReport> {
    let config = ctx.config;
    let reference = ctx.reference;
    let root = ctx.naming.root();

    let used_modes: Vec<usize> = reference.used_modes().iter().copied().collect();
    let mode_groups = mode_combinations(
        used_modes.iter().copied(),
        config.mode_selector.max_depth(used_modes.len()),
    );
    let state_groups = state_combinations(
        reference.states(),
        config
            .state_selector
            .max_depth(total_states(reference.states())),
        &config.keep_states,
    )?;

    // The loop root is shared by every combination directory
    prepare_directory(root, OverwritePolicy::Reuse)?;
    ctx.write(
        "write reference template",
        &ctx.naming.root_template(),
        &reference.serialize(),
    )?;

    let mut report = SweepReport::new(LoopKind::Hamiltonian, root);
    for mode_group in &mode_groups {
        info!(
            "Mode {}: {} mode sets",
            mode_group.label(),
            mode_group.members.len()
        );
        for modes in &mode_group.members {
            for state_group in &state_groups {
                debug!(
                    "State {}: {} state sets",
                    state_group.label(),
                    state_group.members.len()
                );
                for states in &state_group.members {
                    let removed = RemovedParameters::between(reference, modes, states);
                    let name = combination_dir_name(&removed);
                    let outcome = write_combination(ctx, &name, modes, states, &removed);
                    report.record(name, outcome);
                }
            }
        }
    }

    write_directory_list(ctx, &report)?;
    info!(
        "Hamiltonian loop: {} directories written, {} skipped",
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}

fn write_combination(
    ctx: &SweepContext,
    name: &str,
    modes: &ModeSelection,
    states: &StateSelection,
    removed: &RemovedParameters,
) -> Result<PathBuf> {
    let reduced = reduce(ctx.reference, modes, states)?;

    let dir = ctx.naming.dir(name);
    prepare_directory(&dir, ctx.policy)?;
    ctx.write("write reduced template", &ctx.naming.template(&dir), &reduced.serialize())?;
    ctx.write(
        "write removed parameters",
        &ctx.naming.sidecar(&dir),
        &removed.to_sidecar(),
    )?;
    if let Some(molden) = &ctx.molden {
        let removed_modes: BTreeSet<usize> = removed.modes.iter().copied().collect();
        ctx.write(
            "write masked molden",
            &ctx.naming.molden(&dir),
            &zero_frequencies(molden, &removed_modes),
        )?;
    }

    debug!("Combination {} written", name);
    Ok(dir.canonicalize()?)
}

/// Writes one `traj_*` directory per point of the screened parameter space.
///
/// The loop root receives the full reference Hamiltonian (and the molden
/// copy, unmasked); every trajectory directory a `parameters.json` record of
/// its options.
pub fn run_parameter_loop(ctx: &SweepContext) -> Result<SweepReport> {
    let reference = ctx.reference;
    let root = ctx.naming.root();

    let points = build_parameter_space(
        &ctx.config.screening,
        reference.populated_multiplicities(),
    )?;
    let full = reduce(
        reference,
        reference.used_modes(),
        &full_state_selection(reference.states()),
    )?;

    // The loop root is shared by every combination directory
    prepare_directory(root, OverwritePolicy::Reuse)?;
    ctx.write(
        "write reference template",
        &ctx.naming.root_template(),
        &full.serialize(),
    )?;
    if let Some(molden) = &ctx.molden {
        ctx.write(
            "write molden",
            &ctx.naming.molden(root),
            &zero_frequencies(molden, &BTreeSet::new()),
        )?;
    }

    let mut report = SweepReport::new(LoopKind::Parameter, root);
    for point in &points {
        let name = trajectory_dir_name(point);
        let outcome = write_trajectory(ctx, &name, point);
        report.record(name, outcome);
    }

    write_directory_list(ctx, &report)?;
    info!(
        "Parameter loop: {} directories written, {} skipped",
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}

fn write_trajectory(ctx: &SweepContext, name: &str, point: &ParameterPoint) -> Result<PathBuf> {
    let dir = ctx.naming.dir(name);
    prepare_directory(&dir, ctx.policy)?;

    let record = TrajectoryParameters {
        directory: name.to_string(),
        codes: point.codes(),
        options: *point,
        decoherence_parameter: point.decoherence.parameter(),
    };
    let mut json = serde_json::to_string_pretty(&record)?;
    json.push('\n');
    ctx.write("write parameters", &ctx.naming.parameters(&dir), &json)?;

    debug!("Trajectory {} ({}) written", name, point);
    Ok(dir.canonicalize()?)
}

fn write_directory_list(ctx: &SweepContext, report: &SweepReport) -> Result<()> {
    let content: String = report
        .written
        .iter()
        .map(|dir| format!("{}\n", dir.display()))
        .collect();
    ctx.write(
        "write directory list",
        &ctx.naming.directory_list(),
        &content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Selector;
    use crate::parameter_space::AxisChoice;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATE: &str = "v0.txt
1 0 1
epsilon
2
  1   1  0.0
  3   1  0.1
kappa
2
  1   1   7  1.0e-3
  3   1   8  2.0e-3
lambda
0
";

    fn config(temp_dir: &TempDir, loop_kind: LoopKind) -> GymConfig {
        GymConfig {
            loop_kind,
            output_dir: temp_dir.path().to_path_buf(),
            ..GymConfig::default()
        }
    }

    #[test]
    fn test_hamiltonian_loop_without_selectors_writes_one_directory() {
        let temp_dir = TempDir::new().unwrap();
        let reference = Hamiltonian::parse(TEMPLATE).unwrap();
        let config = config(&temp_dir, LoopKind::Hamiltonian);
        let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();

        let report = run_hamiltonian_loop(&ctx).unwrap();
        assert_eq!(report.written.len(), 1);
        assert!(report.skipped.is_empty());

        let dir = temp_dir.path().join("hamiltonian_loop/mminus_0_sminus_0_0_0");
        assert!(dir.is_dir());
        assert_eq!(fs::read_to_string(dir.join("changed_parameters")).unwrap(), "");
        let written = fs::read_to_string(dir.join("LVC.template")).unwrap();
        assert_eq!(Hamiltonian::parse(&written).unwrap(), reference);
    }

    #[test]
    fn test_hamiltonian_loop_enumerates_modes_and_states() {
        let temp_dir = TempDir::new().unwrap();
        let reference = Hamiltonian::parse(TEMPLATE).unwrap();
        let config = GymConfig {
            mode_selector: Selector::Depth(1),
            state_selector: Selector::Depth(1),
            ..config(&temp_dir, LoopKind::Hamiltonian)
        };
        let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();

        let report = run_hamiltonian_loop(&ctx).unwrap();
        // (1 + 2) mode sets times (1 + 2) state sets
        assert_eq!(report.written.len(), 9);

        let list = fs::read_to_string(temp_dir.path().join("hamiltonian_loop/setup_directories"))
            .unwrap();
        assert_eq!(list.lines().count(), 9);

        let dir = temp_dir.path().join("hamiltonian_loop/mminus_7_sminus_0_0_1");
        let reduced =
            Hamiltonian::parse(&fs::read_to_string(dir.join("LVC.template")).unwrap()).unwrap();
        assert_eq!(reduced.states(), &[1, 0, 0]);
        assert!(reduced.kappa().is_empty());
        let removed =
            RemovedParameters::parse(&fs::read_to_string(dir.join("changed_parameters")).unwrap())
                .unwrap();
        assert_eq!(removed.modes, vec![7]);
        assert_eq!(removed.states, vec![vec![], vec![], vec![1]]);
    }

    #[test]
    fn test_refused_directory_is_skipped_and_not_listed() {
        let temp_dir = TempDir::new().unwrap();
        let reference = Hamiltonian::parse(TEMPLATE).unwrap();
        let config = GymConfig {
            state_selector: Selector::Depth(1),
            overwrite: Some(false),
            ..config(&temp_dir, LoopKind::Hamiltonian)
        };
        let blocked = temp_dir.path().join("hamiltonian_loop/mminus_0_sminus_1_0_0");
        fs::create_dir_all(&blocked).unwrap();
        fs::write(blocked.join("keep.me"), "x").unwrap();

        let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();
        let report = run_hamiltonian_loop(&ctx).unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "mminus_0_sminus_1_0_0");
        assert!(!blocked.join("LVC.template").exists());
        let list = fs::read_to_string(temp_dir.path().join("hamiltonian_loop/setup_directories"))
            .unwrap();
        assert!(!list.contains("mminus_0_sminus_1_0_0"));
    }

    #[test]
    fn test_molden_copy_masks_removed_modes() {
        let temp_dir = TempDir::new().unwrap();
        let molden = temp_dir.path().join("V0.molden");
        fs::write(&molden, "[FREQ]\n7.0\n8.0\n").unwrap();
        let reference = Hamiltonian::parse("v0\n1\nkappa\n1\n 1 1 2 0.1\n").unwrap();
        let config = GymConfig {
            molden: Some(molden),
            mode_selector: Selector::Depth(1),
            ..config(&temp_dir, LoopKind::Hamiltonian)
        };
        let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();
        let report = run_hamiltonian_loop(&ctx).unwrap();
        assert_eq!(report.written.len(), 2);

        let root = temp_dir.path().join("hamiltonian_loop");
        let kept = fs::read_to_string(root.join("mminus_0_sminus_0/init.molden")).unwrap();
        assert_eq!(kept, "[FREQ]\n7.0\n8.0\n");
        let masked = fs::read_to_string(root.join("mminus_2_sminus_0/init.molden")).unwrap();
        assert_eq!(masked, "[FREQ]\n7.0\n0.0\n");
    }

    #[test]
    fn test_parameter_loop_writes_one_directory_per_point() {
        let temp_dir = TempDir::new().unwrap();
        let reference = Hamiltonian::parse(TEMPLATE).unwrap();
        let mut config = config(&temp_dir, LoopKind::Parameter);
        config.screening.coupling = AxisChoice::Screen(vec![2, 3]);
        config.screening.hopping = AxisChoice::Screen(vec![2, 3]);
        let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();

        let report = run(&ctx).unwrap();
        assert_eq!(report.written.len(), 4);

        let root = temp_dir.path().join("parameter_loop");
        assert!(root.join("LVC.template").exists());
        let json = fs::read_to_string(root.join("traj_T22122/parameters.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["options"]["coupling"], "nacdr");
        assert_eq!(value["decoherence_parameter"], 0.1);
        assert!(root.join("traj_T33123").is_dir());
    }

    #[test]
    fn test_parameter_loop_rejects_invalid_options_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let reference = Hamiltonian::parse(TEMPLATE).unwrap();
        let mut config = config(&temp_dir, LoopKind::Parameter);
        config.screening.coupling = AxisChoice::Fixed(1);
        let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();

        assert!(matches!(run(&ctx), Err(SweepError::Option(_))));
        assert!(!temp_dir.path().join("parameter_loop").exists());
    }
}
