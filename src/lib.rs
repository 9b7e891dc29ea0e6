#![deny(missing_docs)]

//! lvcgym - Sweep generator for Linear Vibronic Coupling models
//!
//! lvcgym takes a reference LVC Hamiltonian (the `LVC.template` used by
//! surface hopping codes) and sets up a directory tree of systematically
//! varied runs, so the influence of individual normal modes, electronic
//! states and surface hopping options on the dynamics can be measured.
//!
//! # Overview
//!
//! An LVC Hamiltonian holds electronic states grouped by spin multiplicity,
//! linear vibronic terms over the coupled normal modes, and dense property
//! matrices over every state sublevel. Two loops are supported:
//!
//! 1. **Hamiltonian loop**: every combination of removed modes and removed
//!    states up to a chosen depth gets its own reduced template
//!    ```text
//!    hamiltonian_loop/mminus_7-9_sminus_0_0_1/LVC.template
//!    ```
//!
//! 2. **Parameter loop**: the full Hamiltonian combined with every point of
//!    the screened surface hopping option product
//!    ```text
//!    parameter_loop/traj_T32122/parameters.json
//!    ```
//!
//! # Features
//!
//! - **Template parsing**: typed rows and `nalgebra` matrices, validated against
//!   the state counts
//! - **Reduction**: consistent renumbering of kept states, sublevel-aware
//!   submatrix extraction
//! - **Combinations**: mode and state subsets grouped by removal depth, with
//!   pinned states
//! - **Parameter screening**: cartesian product of option codes with
//!   availability and dependency checks
//! - **Molden masking**: frequencies of removed modes zeroed per directory
//!
//! # Quick Start
//!
//! ```no_run
//! use lvcgym::hamiltonian::Hamiltonian;
//! use lvcgym::parser::parse_input;
//! use lvcgym::settings::Settings;
//! use lvcgym::sweep::{run, SweepContext};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = parse_input(Path::new("lvcgym.in"))?;
//!     let reference = Hamiltonian::from_file(&config.template)?;
//!
//!     let ctx = SweepContext::new(&config, &reference, &Settings::default())?;
//!     let report = run(&ctx)?;
//!     println!("{} directories written", report.written.len());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`hamiltonian`](hamiltonian/index.html) - LVC template model, parser and writer
//! - [`reducer`](reducer/index.html) - Mode and state reduction
//! - [`combinations`](combinations/index.html) - Depth-grouped subset generation
//! - [`parameter_space`](parameter_space/index.html) - Surface hopping option product
//! - [`sweep`](sweep/index.html) - Hamiltonian and parameter loops
//! - [`parser`](parser/index.html) - Gym input file parsing
//! - [`settings`](settings/index.html) - Program settings
//! - [`help`](help/index.html) - Built-in help system

/// Gym run configuration
pub mod config;
/// Depth-grouped subset generation
pub mod combinations;
pub mod hamiltonian;
/// Built-in help system
pub mod help;
/// Text formatting and atomic file writes
pub mod io;
/// Molden frequency masking
pub mod molden;
/// Output directory and file naming
pub mod naming;
/// Surface hopping option screening
pub mod parameter_space;
pub mod parser;
/// Mode and state reduction of a Hamiltonian
pub mod reducer;
/// Mode and state selections
pub mod selection;
/// Configuration management system
pub mod settings;
/// Hamiltonian and parameter loops
pub mod sweep;
/// Gym input file templates
pub mod template_generator;
/// Configuration validation and user guidance
pub mod validation;
/// Output directory preparation
pub mod workspace;

pub use config::GymConfig;
pub use hamiltonian::Hamiltonian;
