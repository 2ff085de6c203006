//! Interactive menu for the generator.
//!
//! Lets users pick what to generate and set the seed and output directory
//! without memorizing CLI flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use streetlights_cli_utils::MultiProgress;
use streetlights_generate::default_output_dir;

use crate::{Commands, RunArgs, execute};

/// Top-level actions offered by the menu.
enum Action {
    All,
    Sample,
    SingleStage,
    Report,
    Profiles,
}

impl Action {
    const ALL: &[Self] = &[
        Self::All,
        Self::Sample,
        Self::SingleStage,
        Self::Report,
        Self::Profiles,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::All => "Generate full dataset",
            Self::Sample => "Generate sample dataset",
            Self::SingleStage => "Run a single stage",
            Self::Report => "Supplier coverage report",
            Self::Profiles => "List profiles",
        }
    }
}

const STAGES: &[(&str, Commands)] = &[
    ("Neighborhoods", Commands::Neighborhoods),
    ("Street lights", Commands::Lights),
    ("Suppliers", Commands::Suppliers),
    ("Maintenance requests", Commands::Maintenance),
    ("Enrichment tables", Commands::Enrichment),
];

/// Runs the interactive menu, starting from the flags given on the
/// command line.
///
/// # Errors
///
/// Returns an error if user input fails or the chosen command fails.
pub fn run(defaults: &RunArgs, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Street Lights Dataset Generator");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let command = match Action::ALL[idx] {
        Action::All => Commands::All,
        Action::Sample => Commands::Sample,
        Action::Report => Commands::Report,
        Action::Profiles => return execute(Commands::Profiles, defaults, multi),
        Action::SingleStage => {
            let names: Vec<&str> = STAGES.iter().map(|(name, _)| *name).collect();
            let stage = Select::new()
                .with_prompt("Which stage?")
                .items(&names)
                .default(0)
                .interact()?;
            STAGES[stage].1
        }
    };

    let mut args = defaults.clone();

    let dir_default = args
        .output_dir
        .clone()
        .unwrap_or_else(default_output_dir)
        .display()
        .to_string();
    let dir: String = Input::new()
        .with_prompt("Output directory")
        .default(dir_default)
        .interact_text()?;
    args.output_dir = Some(PathBuf::from(dir.trim()));

    if !matches!(command, Commands::Report) {
        let seed_default = args.seed.map(|s| s.to_string()).unwrap_or_default();
        let seed_str: String = Input::new()
            .with_prompt("Seed (leave empty for a random run)")
            .default(seed_default)
            .allow_empty(true)
            .interact_text()?;
        args.seed = if seed_str.trim().is_empty() {
            None
        } else {
            Some(
                seed_str
                    .trim()
                    .parse()
                    .map_err(|e| format!("Invalid seed '{seed_str}': {e}"))?,
            )
        };

        if !Confirm::new()
            .with_prompt("Existing files in the output directory will be replaced. Continue?")
            .default(true)
            .interact()?
        {
            log::info!("Cancelled");
            return Ok(());
        }
    }

    execute(command, &args, multi)
}
