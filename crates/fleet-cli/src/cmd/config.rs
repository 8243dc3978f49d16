use crate::output::print_json;
use crate::settings::Settings;
use clap::Subcommand;
use fleet_agent::actions::ActionRegistry;
use fleet_core::config::WarnLevel;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Check the config for unknown actions, missing dirs and unsafe names
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(settings: &Settings, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate => validate(settings, json),
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let config = settings.load_config()?;
    let registry = ActionRegistry::builtin();
    let warnings = config.validate(&registry.names());

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
