// src/bin/scout_console.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::*;
use scout_console::{
    console::view::{Frame, SelectOption, View, ViewUpdate},
    create_api, setup_logging, ConfigField, Console, ConsoleApi, ConsoleSettings, Severity,
};
use std::path::PathBuf;

// CLI Arguments using clap
#[derive(Parser)]
#[clap(author, version, about = "Headless console for the market scout backend")]
struct Args {
    /// Path to a TOML settings file
    #[clap(short, long)]
    settings: Option<PathBuf>,

    /// Backend URL (overrides settings and environment)
    #[clap(long)]
    base_url: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load everything and print the form
    Show,

    /// Run a scout with the current configuration
    Scout {
        /// Field edits applied before scouting, e.g. --set minVolume=10000
        #[clap(long = "set", value_name = "FIELD=VALUE")]
        edits: Vec<String>,

        /// Load this preset into the form first
        #[clap(long)]
        preset: Option<String>,
    },

    /// Save the form to the runtime configuration (and the selected preset)
    Save {
        #[clap(long = "set", value_name = "FIELD=VALUE")]
        edits: Vec<String>,

        /// Select this preset first so it is updated too
        #[clap(long)]
        preset: Option<String>,
    },

    /// Reset every field to its default and save the runtime configuration
    Reset,

    /// List presets
    Presets,

    /// Load a preset into the form and print it
    Load { name: String },

    /// Save the current form as a preset
    SavePreset {
        name: String,

        #[clap(long = "set", value_name = "FIELD=VALUE")]
        edits: Vec<String>,
    },

    /// Show or change the automation settings
    Automation {
        /// Webhook URL for unattended runs
        #[clap(long)]
        webhook: Option<String>,

        /// Preset used by unattended runs ("" follows the manual configuration)
        #[clap(long)]
        auto_preset: Option<String>,
    },

    /// Send a test message through a webhook
    TestWebhook {
        /// Defaults to the stored webhook URL
        url: Option<String>,
    },

    /// List tag options matching a query
    Tags {
        #[clap(default_value = "")]
        query: String,
    },
}

/// Prints notifications, status changes and results as they arrive.
#[derive(Default)]
struct TerminalView {
    frame: Frame,
}

impl View for TerminalView {
    fn apply(&mut self, updates: &[ViewUpdate]) {
        for update in updates {
            match update {
                ViewUpdate::Notification(Some(note)) => {
                    let marker = match note.severity {
                        Severity::Success => "✅",
                        Severity::Info => "ℹ️",
                        Severity::Warning => "⚠️",
                        Severity::Error => "❌",
                    };
                    println!("{} {}", marker, note.message);
                }
                ViewUpdate::Status(Some(status)) => println!("… {}", status),
                ViewUpdate::Results(Some(results)) => {
                    println!("\n=== Scout results ===\n{}\n", results);
                }
                _ => {}
            }
            self.frame.apply(update);
        }
    }
}

impl TerminalView {
    fn print_form(&self) {
        println!("\nConfiguration:");
        for field in ConfigField::ALL {
            println!("  {:<16} {}", field.form_name(), self.frame.field(field));
        }
        let preset = &self.frame.presets.selected;
        println!(
            "  {:<16} {}",
            "preset",
            if preset.is_empty() { "(none)" } else { preset.as_str() }
        );
    }

    fn print_automation(&self) {
        println!("\nAutomation:");
        println!("  {:<16} {}", "webhookUrl", self.frame.webhook_url);
        let auto = &self.frame.auto_preset.selected;
        println!(
            "  {:<16} {}",
            "autoPreset",
            if auto.is_empty() { "(follow manual configuration)" } else { auto.as_str() }
        );
    }
}

fn print_options(title: &str, options: &[SelectOption]) {
    println!("\n{}:", title);
    for option in options.iter().filter(|o| !o.value.is_empty()) {
        println!("  - {}", option.label);
    }
}

fn parse_edit(edit: &str) -> Result<(ConfigField, String)> {
    let (name, value) = edit
        .split_once('=')
        .with_context(|| format!("Expected FIELD=VALUE, got {}", edit))?;
    let field = ConfigField::parse(name.trim())
        .with_context(|| format!("Unknown configuration field: {}", name))?;
    Ok((field, value.to_string()))
}

fn apply_edits<A: ConsoleApi>(console: &mut Console<A, TerminalView>, edits: &[String]) -> Result<()> {
    for edit in edits {
        let (field, value) = parse_edit(edit)?;
        console.set_field(field, value);
    }
    Ok(())
}

async fn select<A: ConsoleApi>(console: &mut Console<A, TerminalView>, preset: Option<&str>) -> Result<()> {
    if let Some(name) = preset {
        console
            .select_preset(name)
            .await
            .with_context(|| format!("Failed to load preset {}", name))?;
    }
    Ok(())
}

// tokio current-thread runtime: the console is single-threaded by design
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging();

    let mut settings = ConsoleSettings::load(args.settings.as_deref())?;
    if let Some(url) = args.base_url {
        settings.base_url = url;
    }
    info!("Using scout backend at {}", settings.base_url);

    let api = create_api(&settings)?;
    let mut console = Console::new(api, TerminalView::default(), &settings);

    let report = console.startup().await;
    for (step, error) in &report.failures {
        debug!("Startup step {} failed: {}", step, error);
    }

    match args.command {
        Commands::Show => {
            console.view().print_form();
            print_options("Presets", &console.frame().presets.options);
            console.view().print_automation();
        }
        Commands::Scout { edits, preset } => {
            select(&mut console, preset.as_deref()).await?;
            apply_edits(&mut console, &edits)?;
            console.scout().await?;
        }
        Commands::Save { edits, preset } => {
            select(&mut console, preset.as_deref()).await?;
            apply_edits(&mut console, &edits)?;
            console.save_config().await?;
        }
        Commands::Reset => {
            console.reset_to_defaults();
            console.save_config().await?;
        }
        Commands::Presets => {
            print_options("Presets", &console.frame().presets.options);
        }
        Commands::Load { name } => {
            select(&mut console, Some(&name)).await?;
            console.view().print_form();
        }
        Commands::SavePreset { name, edits } => {
            apply_edits(&mut console, &edits)?;
            console.save_preset_as(&name).await?;
        }
        Commands::Automation { webhook, auto_preset } => {
            let changed = webhook.is_some() || auto_preset.is_some();
            if let Some(url) = webhook {
                console.set_webhook_url(url);
            }
            if let Some(name) = auto_preset.as_deref() {
                console.set_auto_preset(Some(name))?;
            }
            if changed {
                console.save_automation().await?;
            }
            console.view().print_automation();
        }
        Commands::TestWebhook { url } => {
            console.test_webhook(url.as_deref()).await?;
        }
        Commands::Tags { query } => {
            let matches = console.tag_suggestions(&query);
            print_options("Tags", &matches);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit() {
        let (field, value) = parse_edit("minVolume=10000").unwrap();
        assert_eq!(field, ConfigField::MinVolume);
        assert_eq!(value, "10000");

        let (field, value) = parse_edit("SCOUT_EXCLUDE_KEYWORDS=nba,nfl").unwrap();
        assert_eq!(field, ConfigField::ExcludeKeywords);
        assert_eq!(value, "nba,nfl");

        assert!(parse_edit("minVolume").is_err());
        assert!(parse_edit("volume=1").is_err());
    }
}
