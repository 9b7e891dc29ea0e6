//! lvcgym Command-Line Interface
//!
//! This module contains the main entry point for the lvcgym program and handles
//! command-line argument parsing, help system integration, and orchestration of
//! the two loops.
//!
//! # Usage
//!
//! lvcgym supports three commands:
//!
//! 1. **Input Creation** (`lvcgym ci <LVC.template> [output_file]`):
//!    Creates a gym input file for a reference template
//!
//! 2. **Settings Creation** (`lvcgym ci lvcgym_config.cfg`):
//!    Creates a commented settings file
//!
//! 3. **Loop Setup** (`lvcgym <input_file>`):
//!    Sets up the Hamiltonian or parameter loop described by the input file
//!
//! # Examples
//!
//! ```bash
//! lvcgym ci LVC.template
//! lvcgym lvcgym.in
//! lvcgym --help options
//! ```

use lvcgym::settings::{SettingsManager, SETTINGS_FILE};
use lvcgym::sweep::SweepContext;
use lvcgym::*;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    // Console logger for all commands, at the level from the settings files
    let level = SettingsManager::load()
        .ok()
        .and_then(|manager| manager.logging().level_filter().ok())
        .unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    check_help_flags(&args);

    let command = &args[1];

    match command.as_str() {
        "ci" => {
            if args.len() < 3 {
                eprintln!("Error: Missing file argument");
                eprintln!("Usage:");
                eprintln!(
                    "  {} ci <LVC.template> [output_file]  - Create gym input",
                    args[0]
                );
                eprintln!(
                    "  {} ci {}            - Create settings template",
                    args[0], SETTINGS_FILE
                );
                process::exit(1);
            }

            let file_arg = &args[2];

            if file_arg == SETTINGS_FILE {
                match run_create_settings_template() {
                    Ok(()) => {
                        println!("✓ Settings template created successfully!");
                        println!("  Output file: {}", SETTINGS_FILE);
                        println!("\nNext steps:");
                        println!("  1. Review and edit the {} file", SETTINGS_FILE);
                        println!("  2. The settings will be automatically loaded by lvcgym");
                    }
                    Err(e) => {
                        eprintln!("Error creating settings template: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                let template_path = Path::new(file_arg);
                let output_path = args.get(3).map(Path::new);

                match run_create_input(template_path, output_path) {
                    Ok(output_file) => {
                        println!("✓ Gym input file created successfully!");
                        println!("  Output file: {}", output_file.display());
                        println!("\nNext steps:");
                        println!("  1. Choose the loop and its selectors");
                        println!("  2. Run lvcgym: {} {}", args[0], output_file.display());
                    }
                    Err(e) => {
                        eprintln!("Error creating gym input: {}", e);
                        process::exit(1);
                    }
                }
            }
        }
        _ => {
            if !command.starts_with('-') {
                let input_path = Path::new(&args[1]);
                match run_gym(input_path) {
                    Ok(()) => println!("\n****lvcgym setup finished****"),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                eprintln!("Error: Unknown command: {}", command);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }
}

/// Check for help flags and print appropriate help
fn check_help_flags(args: &[String]) {
    if args[1] == "--help" || args[1] == "-h" {
        help::print_topic(args.get(2).map(String::as_str));
        process::exit(0);
    }

    // lvcgym ci --help
    if args.len() >= 3 && args[1] == "ci" && (args[2] == "--help" || args[2] == "-h") {
        help::print_examples();
        process::exit(0);
    }
}

/// Prints usage information to stderr.
fn print_usage(program_name: &str) {
    eprintln!("lvcgym - Sweep generator for Linear Vibronic Coupling models");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} ci <LVC.template> [output_file]", program_name);
    eprintln!("                    Create a gym input file for a reference template");
    eprintln!();
    eprintln!("  {} ci {}", program_name, SETTINGS_FILE);
    eprintln!("                    Create a settings template file for configuration");
    eprintln!();
    eprintln!("  {} <input_file>", program_name);
    eprintln!("                    Set up the loop described by the input file");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} ci LVC.template", program_name);
    eprintln!("  {} lvcgym.in", program_name);
    eprintln!("  {} --help keywords", program_name);
}

/// Creates a gym input file for an LVC template.
///
/// # Arguments
///
/// * `lvc_template` - Path to the reference template
/// * `output_path` - Optional custom output path; if None, `lvcgym.in` is
///   written next to the template
///
/// # Returns
///
/// Returns the path of the created input file.
fn run_create_input(
    lvc_template: &Path,
    output_path: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    use lvcgym::template_generator::*;

    println!("Reading template from: {}", lvc_template.display());
    let content = generate_template_from_file(lvc_template)?;

    let output_path = match output_path {
        Some(p) => p.to_path_buf(),
        None => get_default_output_path(lvc_template),
    };
    if output_path.exists() {
        return Err(format!(
            "{} already exists. Please remove it first or choose a different name.",
            output_path.display()
        )
        .into());
    }

    write_template_to_file(&content, &output_path)?;
    Ok(output_path)
}

/// Creates a lvcgym_config.cfg template file in the current directory.
///
/// # Errors
///
/// Returns an error if the file already exists or cannot be written.
fn run_create_settings_template() -> Result<(), Box<dyn std::error::Error>> {
    let settings_path = Path::new(SETTINGS_FILE);

    if settings_path.exists() {
        return Err(format!(
            "{} already exists. Please remove it first or choose a different location.",
            SETTINGS_FILE
        )
        .into());
    }

    SettingsManager::create_template(settings_path)?;
    Ok(())
}

/// Prints the parsed input and the settings in effect.
fn print_configuration(
    config: &GymConfig,
    settings_manager: &SettingsManager,
    debug_log_file: Option<&Path>,
) {
    println!("{}", "=".repeat(76));
    println!("CONFIGURATION AND SETTINGS");
    println!("{}", "=".repeat(76));
    println!("Settings source: {}", settings_manager.config_source());
    println!();
    println!("  Input:");
    println!("    Template:                  {}", config.template.display());
    if let Some(molden) = &config.molden {
        println!("    Molden:                    {}", molden.display());
    }
    println!("    Loop:                      {}", config.loop_kind.dir_name());
    println!("    Mode selector:             {}", config.mode_selector);
    println!("    State selector:            {}", config.state_selector);
    if !config.keep_states.is_empty() {
        let pins: Vec<String> = config.keep_states.iter().map(|p| p.to_string()).collect();
        println!("    Keep states:               {}", pins.join(" "));
    }
    println!("    Output directory:          {}", config.output_dir.display());

    let settings = settings_manager.settings();
    println!("  General Settings:");
    println!(
        "    Print Level:               {}",
        settings.general.print_level
    );
    println!(
        "    Overwrite:                 {}",
        config.overwrite.unwrap_or(settings.general.overwrite)
    );
    println!("  Logging Settings:");
    println!("    Level:                     {}", settings.logging.level);
    println!(
        "    File Logging Enabled:      {}",
        settings.logging.file_logging
    );
    if let Some(log_file) = debug_log_file {
        println!("    Debug Log File:            {}", log_file.display());
    }
    println!("{}", "=".repeat(76));
    println!();
}

/// Sets up the loop described by a gym input file.
///
/// 1. Load settings and open the debug log if enabled
/// 2. Parse the input file and the reference template
/// 3. Validate the configuration against the template
/// 4. Run the selected loop
fn run_gym(input_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("**** lvcgym: LVC Hamiltonian and parameter sweeps ****");
    println!("              Version {}", env!("CARGO_PKG_VERSION"));
    println!();

    let settings_manager = SettingsManager::load()?;

    let debug_log_file = if settings_manager.logging().file_logging {
        let input_stem = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("job");
        let log_file = PathBuf::from(format!("lvcgym_{}.log", input_stem));
        let mut file = std::fs::File::create(&log_file)
            .map_err(|e| format!("Failed to create log file {}: {}", log_file.display(), e))?;
        writeln!(file, "lvcgym debug log started for {}", input_path.display())
            .map_err(|e| format!("Failed to write to log file: {}", e))?;
        Some(log_file)
    } else {
        None
    };

    let config = parser::parse_input(input_path)?;
    print_configuration(&config, &settings_manager, debug_log_file.as_deref());

    let reference = Hamiltonian::from_file(&config.template)?;
    log::info!(
        "Parsed {}: {} states, {} coupled modes",
        config.template.display(),
        reference.nr_states(),
        reference.used_modes().len()
    );

    if let Err(e) = validation::validate_config(&config, &reference) {
        eprintln!("Configuration Error: {}", e);
        return Err(e.into());
    }
    validation::provide_user_guidance(&config, &reference);

    let ctx = SweepContext::new(&config, &reference, settings_manager.settings())?;
    let report = sweep::run(&ctx)?;

    if let Some(log_file) = &debug_log_file {
        let mut file = std::fs::OpenOptions::new().append(true).open(log_file)?;
        writeln!(file, "{}", serde_json::to_string_pretty(&report)?)?;
    }

    println!(
        "{} directories set up under {}",
        report.written.len(),
        report.root.display()
    );
    if !report.skipped.is_empty() {
        println!("{} combinations skipped (see log above)", report.skipped.len());
    }
    Ok(())
}
