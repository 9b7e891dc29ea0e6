use crate::hamiltonian::Hamiltonian;
use crate::selection::join;
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of a generated gym input file.
pub const DEFAULT_INPUT_NAME: &str = "lvcgym.in";

/// Template generator for creating gym input files from LVC templates
///
/// Parses the template so the generated input can list its coupled modes and
/// state counts next to the selector keywords.
pub fn generate_template_from_file<P: AsRef<Path>>(
    lvc_template: P,
) -> Result<String, Box<dyn std::error::Error>> {
    let lvc_template = lvc_template.as_ref();

    if !lvc_template.exists() {
        return Err(format!("File not found: {}", lvc_template.display()).into());
    }

    let hamiltonian = Hamiltonian::from_file(lvc_template)?;
    let template_path = lvc_template.canonicalize()?;

    Ok(generate_template(&hamiltonian, &template_path))
}

/// Generate the gym input file content
fn generate_template(hamiltonian: &Hamiltonian, template_path: &Path) -> String {
    let template_name = template_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("LVC.template");

    let modes: Vec<usize> = hamiltonian.used_modes().iter().copied().collect();
    let modes = if modes.is_empty() {
        "none".to_string()
    } else {
        join(&modes, " ")
    };
    let first_pin = hamiltonian
        .states()
        .iter()
        .position(|&n| n > 0)
        .map(|m| format!("{}:1", m + 1))
        .unwrap_or_else(|| "1:1".to_string());

    format!(
        r#"# lvcgym input generated from {template_name}
# states per multiplicity: {states}
# coupled normal modes:    {modes}

template = {template_name}
#molden = V0.molden # frequencies of removed modes are zeroed in every copy
loop = hamiltonian # hamiltonian (1) or parameter (2)
output_dir = .
#overwrite = false # skip directories that already hold files

# Hamiltonian loop: none, all or depth N
mode_selector = depth 1
state_selector = none
#keep_states = {first_pin} # mult:index, kept in every state combination

# Parameter loop: one code or a list of codes per option (see lvcgym --help options)
representation = 1
coupling = 3
ekincorrect = 2
reflect = 1
decoherence = 2
hopping = 2
"#,
        template_name = template_name,
        states = join(hamiltonian.states(), " "),
        modes = modes,
        first_pin = first_pin,
    )
}

/// Write template to file
pub fn write_template_to_file<P: AsRef<Path>>(
    template: &str,
    output_path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(output_path, template)?;
    Ok(())
}

/// Get default output filename: the gym input next to the LVC template
pub fn get_default_output_path<P: AsRef<Path>>(lvc_template: P) -> PathBuf {
    match lvc_template.as_ref().parent() {
        Some(dir) => dir.join(DEFAULT_INPUT_NAME),
        None => PathBuf::from(DEFAULT_INPUT_NAME),
    }
}
