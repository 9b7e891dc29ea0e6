// End-to-end tests: gym input file -> loop directory tree
use lvcgym::hamiltonian::Hamiltonian;
use lvcgym::parser::parse_input;
use lvcgym::selection::RemovedParameters;
use lvcgym::settings::Settings;
use lvcgym::sweep::{run, SweepContext};
use lvcgym::validation::{validate_config, ErrorCategory};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

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
";

const MOLDEN: &str = "[Molden Format]
[FREQ]
100.0
200.0
300.0
400.0
500.0
600.0
700.0
800.0
900.0
[FR-COORD]
";

fn write_inputs(dir: &Path, input: &str) -> std::path::PathBuf {
    fs::write(dir.join("LVC.template"), TEMPLATE).unwrap();
    fs::write(dir.join("V0.molden"), MOLDEN).unwrap();
    let input_path = dir.join("lvcgym.in");
    fs::write(&input_path, input).unwrap();
    input_path
}

#[test]
fn test_hamiltonian_loop_from_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = write_inputs(
        temp_dir.path(),
        "template LVC.template\nmolden V0.molden\nloop hamiltonian\n\
         mode_selector depth 1\nstate_selector depth 1\nkeep_states 1:1\n",
    );

    let config = parse_input(&input_path).unwrap();
    let reference = Hamiltonian::from_file(&config.template).unwrap();
    validate_config(&config, &reference).unwrap();

    let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();
    let report = run(&ctx).unwrap();

    // 4 mode sets (none or one of 3 removed) x 3 state sets (pin kept, 2 free)
    assert_eq!(report.written.len(), 12);
    assert!(report.skipped.is_empty());

    let root = temp_dir.path().join("hamiltonian_loop");
    assert_eq!(
        Hamiltonian::from_file(&root.join("LVC.template")).unwrap(),
        reference
    );

    let listed = fs::read_to_string(root.join("setup_directories")).unwrap();
    let listed: Vec<&str> = listed.lines().collect();
    assert_eq!(listed.len(), 12);
    for (line, dir) in listed.iter().zip(&report.written) {
        assert_eq!(Path::new(line), dir.as_path());
        assert!(dir.is_absolute());
    }

    let dir = root.join("mminus_9_sminus_2_0_0");
    let reduced = Hamiltonian::from_file(&dir.join("LVC.template")).unwrap();
    assert_eq!(reduced.states(), &[1, 0, 1]);
    assert!(!reduced.used_modes().contains(&9));

    let removed =
        RemovedParameters::parse(&fs::read_to_string(dir.join("changed_parameters")).unwrap())
            .unwrap();
    assert_eq!(removed.modes, vec![9]);
    assert_eq!(removed.states, vec![vec![2], vec![], vec![]]);

    let molden = fs::read_to_string(dir.join("init.molden")).unwrap();
    let freqs: Vec<&str> = molden.lines().skip(2).take(9).collect();
    assert_eq!(freqs[8], "0.0");
    assert_eq!(freqs[2], "300.0");

    // Pinned singlet 1 is never removed
    assert!(!root.join("mminus_0_sminus_1_0_0").exists());
}

#[test]
fn test_unchanged_combination_has_empty_sidecar() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = write_inputs(temp_dir.path(), "template LVC.template\n");

    let config = parse_input(&input_path).unwrap();
    let reference = Hamiltonian::from_file(&config.template).unwrap();
    let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();
    let report = run(&ctx).unwrap();

    assert_eq!(report.written.len(), 1);
    let dir = temp_dir.path().join("hamiltonian_loop/mminus_0_sminus_0_0_0");
    assert_eq!(fs::read_to_string(dir.join("changed_parameters")).unwrap(), "");
    assert!(!dir.join("init.molden").exists());
}

#[test]
fn test_parameter_loop_from_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = write_inputs(
        temp_dir.path(),
        "template LVC.template\nloop parameter\nrepresentation 1 2\ndecoherence 1~3\n",
    );

    let config = parse_input(&input_path).unwrap();
    let reference = Hamiltonian::from_file(&config.template).unwrap();
    validate_config(&config, &reference).unwrap();

    let ctx = SweepContext::new(&config, &reference, &Settings::default()).unwrap();
    let report = run(&ctx).unwrap();
    assert_eq!(report.written.len(), 6);

    let root = temp_dir.path().join("parameter_loop");
    let json = fs::read_to_string(root.join("traj_F32122/parameters.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["options"]["representation"], "mch");
    assert_eq!(value["options"]["decoherence"], "edc");
    assert_eq!(value["decoherence_parameter"], 0.1);

    let json = fs::read_to_string(root.join("traj_T32112/parameters.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["decoherence_parameter"].is_null());
}

#[test]
fn test_parallel_nac_without_nacdr_is_rejected_up_front() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = write_inputs(
        temp_dir.path(),
        "template LVC.template\nloop parameter\ncoupling 2 3\nekincorrect 3\n",
    );

    let config = parse_input(&input_path).unwrap();
    let reference = Hamiltonian::from_file(&config.template).unwrap();
    let err = validate_config(&config, &reference).unwrap_err();
    assert_eq!(err.category, ErrorCategory::InvalidOption);
    assert!(!temp_dir.path().join("parameter_loop").exists());
}
