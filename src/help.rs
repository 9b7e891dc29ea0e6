//! Built-in help for lvcgym
//!
//! This module documents the gym input keywords, the surface hopping option
//! codes used by the parameter loop, and typical invocations.

use crate::config::LoopKind;
use crate::parameter_space::{
    Coupling, Decoherence, EkinCorrect, HoppingScheme, Representation, ScreeningOption,
};
use crate::settings::SETTINGS_FILE;
use std::collections::BTreeMap;

/// Category for organizing keywords in the help system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeywordCategory {
    /// Input and output locations.
    Files,
    /// Keywords read by the Hamiltonian loop.
    HamiltonianLoop,
    /// Keywords read by the parameter loop.
    ParameterLoop,
}

impl KeywordCategory {
    fn header(self) -> &'static str {
        match self {
            KeywordCategory::Files => "FILES AND LOOP SELECTION",
            KeywordCategory::HamiltonianLoop => "HAMILTONIAN LOOP",
            KeywordCategory::ParameterLoop => "PARAMETER LOOP",
        }
    }
}

/// Documentation entry for a single input keyword.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// The name of the keyword (e.g., "mode_selector").
    pub name: &'static str,
    /// The category to which this keyword belongs.
    pub category: KeywordCategory,
    /// A brief description of what the keyword does.
    pub description: &'static str,
    /// The default value of the keyword, if applicable.
    pub default_value: Option<&'static str>,
    /// An example of how to use the keyword in an input file.
    pub example: Option<&'static str>,
}

/// All keyword documentation
pub const KEYWORDS: &[Keyword] = &[
    Keyword {
        name: "template",
        category: KeywordCategory::Files,
        description: "Reference LVC template every combination is derived from",
        default_value: Some("LVC.template"),
        example: Some("template = LVC.template"),
    },
    Keyword {
        name: "molden",
        category: KeywordCategory::Files,
        description: "Molden file copied into each directory with removed modes' frequencies zeroed",
        default_value: None,
        example: Some("molden = V0.molden"),
    },
    Keyword {
        name: "loop",
        category: KeywordCategory::Files,
        description: "Loop to set up: hamiltonian (1) or parameter (2)",
        default_value: Some("hamiltonian"),
        example: Some("loop = parameter"),
    },
    Keyword {
        name: "output_dir",
        category: KeywordCategory::Files,
        description: "Directory the hamiltonian_loop or parameter_loop directory is created in",
        default_value: Some("."),
        example: Some("output_dir = runs"),
    },
    Keyword {
        name: "overwrite",
        category: KeywordCategory::Files,
        description: "Reuse existing non-empty directories; false skips them",
        default_value: Some("general.overwrite from the settings file"),
        example: Some("overwrite = false"),
    },
    Keyword {
        name: "mode_selector",
        category: KeywordCategory::HamiltonianLoop,
        description: "How many coupled normal modes to remove: none, all or depth N",
        default_value: Some("none"),
        example: Some("mode_selector = depth 2"),
    },
    Keyword {
        name: "state_selector",
        category: KeywordCategory::HamiltonianLoop,
        description: "How many electronic states to remove: none, all or depth N",
        default_value: Some("none"),
        example: Some("state_selector = all"),
    },
    Keyword {
        name: "keep_states",
        category: KeywordCategory::HamiltonianLoop,
        description: "States present in every state combination, written mult:index",
        default_value: None,
        example: Some("keep_states = 1:1 3:1"),
    },
    Keyword {
        name: "representation",
        category: KeywordCategory::ParameterLoop,
        description: "Representation codes to screen (see --help options)",
        default_value: Some("1"),
        example: Some("representation = 1 2"),
    },
    Keyword {
        name: "coupling",
        category: KeywordCategory::ParameterLoop,
        description: "Coupling quantity codes to screen",
        default_value: Some("3"),
        example: Some("coupling = 2 3"),
    },
    Keyword {
        name: "ekincorrect",
        category: KeywordCategory::ParameterLoop,
        description: "Kinetic energy adjustment codes to screen after a hop",
        default_value: Some("2"),
        example: Some("ekincorrect = 1~4"),
    },
    Keyword {
        name: "reflect",
        category: KeywordCategory::ParameterLoop,
        description: "Frustrated hop reflection codes to screen",
        default_value: Some("1"),
        example: Some("reflect = 1 2"),
    },
    Keyword {
        name: "decoherence",
        category: KeywordCategory::ParameterLoop,
        description: "Decoherence correction codes to screen",
        default_value: Some("2"),
        example: Some("decoherence = 1~3"),
    },
    Keyword {
        name: "hopping",
        category: KeywordCategory::ParameterLoop,
        description: "Surface hopping scheme codes to screen",
        default_value: Some("2"),
        example: Some("hopping = 2 3"),
    },
];

/// Print global help
pub fn print_global_help() {
    println!("lvcgym - Sweep generator for Linear Vibronic Coupling models");
    println!();
    println!("USAGE:");
    println!("    lvcgym [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    ci <LVC.template> [output_file]");
    println!("                        Create a gym input file for a reference template");
    println!();
    println!("    ci {}", SETTINGS_FILE);
    println!("                        Create a configuration template file");
    println!();
    println!("    <input_file>");
    println!("                        Set up the loop described by the input file");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help [topic]   Show help. Topics: keywords, options, examples");
    println!();
    println!("LOOPS:");
    for kind in [LoopKind::Hamiltonian, LoopKind::Parameter] {
        println!("    {:<20}{}", kind.dir_name(), kind.description());
    }
    println!();
    println!("CONFIGURATION FILE:");
    println!("    lvcgym uses '{}' for program configuration.", SETTINGS_FILE);
    println!("    Supported locations:");
    println!("      - ./{} (local, highest priority)", SETTINGS_FILE);
    println!("      - ~/.config/lvcgym/{} (user)", SETTINGS_FILE);
    println!("      - /etc/lvcgym/{} (system)", SETTINGS_FILE);
    println!();
    println!("EXAMPLES:");
    println!("    Create input:        lvcgym ci LVC.template");
    println!("    Set up loop:         lvcgym lvcgym.in");
    println!("    View keywords:       lvcgym --help keywords");
    println!("    View option codes:   lvcgym --help options");
    println!();
}

/// Print keyword reference
pub fn print_keyword_help() {
    println!("KEYWORD REFERENCE");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();

    let mut categories: BTreeMap<KeywordCategory, Vec<&Keyword>> = BTreeMap::new();
    for keyword in KEYWORDS {
        categories
            .entry(keyword.category)
            .or_default()
            .push(keyword);
    }

    for (category, keywords) in categories {
        println!("{}", category.header());
        println!("{}", "─".repeat(76));
        println!();
        for keyword in keywords {
            print_keyword(keyword);
            println!();
        }
    }
}

/// Print the option codes accepted by the screening keywords
pub fn print_option_help() {
    println!("SCREENING OPTION CODES");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    print_option_table::<Representation>();
    print_option_table::<Coupling>();
    print_option_table::<EkinCorrect>();

    println!("REFLECT");
    println!("{}", "─".repeat(76));
    for option in EkinCorrect::all() {
        println!("    {}  {}", option.code(), option.reflect_description());
    }
    println!();

    print_option_table::<Decoherence>();
    print_option_table::<HoppingScheme>();

    println!("Directories of the parameter loop are named");
    println!("traj_<T|F><coupling><ekincorrect><reflect><decoherence><hopping>,");
    println!("T standing for the diagonal representation.");
    println!();
}

fn print_option_table<T: ScreeningOption>() {
    println!("{}", T::AXIS.to_uppercase());
    println!("{}", "─".repeat(76));
    for option in T::all() {
        let note = if option.is_available() {
            ""
        } else {
            " [not available]"
        };
        println!(
            "    {}  {:<14}{}{}",
            option.code(),
            option.name(),
            option.description(),
            note
        );
    }
    println!();
}

/// Print example usages
pub fn print_examples() {
    println!("USAGE EXAMPLES");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    println!("HAMILTONIAN LOOP");
    println!("{}", "─".repeat(76));
    println!("template        LVC.template");
    println!("molden          V0.molden");
    println!("loop            hamiltonian");
    println!("mode_selector   depth 1");
    println!("state_selector  depth 1");
    println!("keep_states     1:1");
    println!();
    println!("    Creates hamiltonian_loop/ with one directory per combination, e.g.");
    println!("    mminus_7_sminus_0_0_1 (mode 7 and triplet 1 removed). Each holds the");
    println!("    reduced template, the changed_parameters record and the masked molden.");
    println!();
    println!("PARAMETER LOOP");
    println!("{}", "─".repeat(76));
    println!("template        LVC.template");
    println!("loop            parameter");
    println!("coupling        2 3");
    println!("decoherence     1~3");
    println!();
    println!("    Creates parameter_loop/ with one traj_* directory per option");
    println!("    combination, each holding a parameters.json record.");
    println!();
    println!("Every loop root also lists its completed directories in setup_directories.");
    println!();
}

fn print_keyword(keyword: &Keyword) {
    println!("{}", keyword.name);
    println!("    {}", keyword.description);

    if let Some(default) = keyword.default_value {
        println!("    Default: {}", default);
    }

    if let Some(example) = keyword.example {
        println!("    Example: {}", example);
    }
}

/// Prints the help for `topic`, falling back to the global help.
pub fn print_topic(topic: Option<&str>) {
    match topic {
        Some("keywords") => print_keyword_help(),
        Some("options") => print_option_help(),
        Some("examples") => print_examples(),
        _ => print_global_help(),
    }
}
