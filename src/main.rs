//! shortcut-kit CLI - inspect and edit stored shortcut bindings
//!
//! Works on the same JSON store a host application uses, with the same
//! validation the recorder applies (minus live menu state).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;

use shortcut_kit::config::{self, Config};
use shortcut_kit::error::ShortcutError;
use shortcut_kit::logging;
use shortcut_kit::shortcuts::{
    Name, ReservedSource, Shortcut, ShortcutManager, ShortcutManagerBuilder, StoredEntry,
};

#[derive(Parser)]
#[command(name = "shortcut-kit")]
#[command(about = "Manage named keyboard shortcuts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: ~/.shortcut-kit/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every stored shortcut
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the shortcut bound to a name
    Get {
        name: String,
    },
    /// Bind a shortcut, e.g. `set toggle cmd+shift+k`
    Set {
        name: String,
        /// Combination such as cmd+shift+k
        combo: String,
        /// Take the shortcut from another name that already uses it
        #[arg(long)]
        force: bool,
    },
    /// Unbind a name (its default stays off until reset)
    Remove {
        name: String,
    },
    /// Forget the stored choice so the default applies again
    Reset {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,
        /// Reset every stored name
        #[arg(long)]
        all: bool,
    },
    /// Check whether a combination can be bound
    Check {
        combo: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntry {
    name: String,
    shortcut: Option<String>,
    display: Option<String>,
    unbound: bool,
}

fn describe(manager: &ShortcutManager, shortcut: Option<Shortcut>) -> String {
    match shortcut {
        Some(s) => format!(
            "{} ({})",
            s.to_canonical_string(),
            s.description_for_platform(manager.platform())
        ),
        None => "unbound".to_string(),
    }
}

fn parse_combo(combo: &str) -> anyhow::Result<Shortcut> {
    Shortcut::parse(combo).with_context(|| format!("Invalid shortcut '{}'", combo))
}

/// Declare every stored name so conflict checks see them.
fn declare_stored(manager: &ShortcutManager) {
    for id in manager.store().stored_names() {
        manager.declare(&Name::new(id));
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config: Config = config::load_config(&config_path);
    let _guard = logging::init(&config.log);
    let manager = ShortcutManagerBuilder::from_config(&config).build();

    match cli.command {
        Commands::List { json } => {
            let mut ids = manager.store().stored_names();
            ids.sort();
            let entries: Vec<ListEntry> = ids
                .into_iter()
                .map(|id| {
                    let stored = manager.store().stored(&Name::new(&id));
                    let shortcut = match stored {
                        StoredEntry::Bound(s) => Some(s),
                        _ => None,
                    };
                    ListEntry {
                        name: id,
                        shortcut: shortcut.map(|s| s.to_canonical_string()),
                        display: shortcut.map(|s| s.description_for_platform(manager.platform())),
                        unbound: shortcut.is_none(),
                    }
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No stored shortcuts");
            } else {
                for entry in &entries {
                    let value = match (&entry.shortcut, &entry.display) {
                        (Some(s), Some(d)) => format!("{} ({})", s, d),
                        _ => "unbound".to_string(),
                    };
                    println!("{:<24} {}", entry.name, value);
                }
            }
        }
        Commands::Get { name } => {
            let shortcut = manager.current_shortcut(&Name::new(&name));
            println!("{}", describe(&manager, shortcut));
        }
        Commands::Set { name, combo, force } => {
            let shortcut = parse_combo(&combo)?;
            let name = Name::new(&name);
            declare_stored(&manager);
            match manager.validate(&name, &shortcut) {
                Ok(()) => {}
                Err(ShortcutError::ConflictsWithName(other)) if force => {
                    manager.remove(&other);
                    println!("Unbound '{}'", other);
                }
                Err(e) => bail!(e.user_message()),
            }
            let report = manager.set_shortcut(&name, shortcut)?;
            println!("{} = {}", report.name, describe(&manager, report.shortcut));
        }
        Commands::Remove { name } => {
            let report = manager.remove(&Name::new(&name));
            println!("{} = {}", report.name, describe(&manager, report.shortcut));
        }
        Commands::Reset { name, all } => {
            let reports = if all {
                manager.reset_all()
            } else {
                let Some(name) = name else {
                    bail!("Name required unless --all is given");
                };
                vec![manager.reset(&Name::new(&name))]
            };
            for report in reports {
                println!("{} = {}", report.name, describe(&manager, report.shortcut));
            }
        }
        Commands::Check { combo } => {
            let shortcut = parse_combo(&combo)?;
            if !shortcut.is_valid() {
                println!("invalid");
            } else {
                match manager.is_reserved(&shortcut).map(|entry| entry.source) {
                    Some(ReservedSource::System { label }) => {
                        println!("reserved by system: {}", label)
                    }
                    Some(ReservedSource::Menu { title }) => println!("reserved by menu: {}", title),
                    None => println!("valid"),
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
