//! Settings database command-line tool.
//!
//! Reads and edits a settings file directly, without a running application.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use settings_db::cli::{parse_value, Cli, SettingsCommand};
use settings_db::SettingsDatabase;

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let default_level = if args.verbose { "settings_db=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = SettingsDatabase::open_with_config(&args.dir, &args.name, args.config());
    if !settings.is_open() {
        eprintln!(
            "Warning: changes will not be saved; could not open {}",
            settings
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );
    }

    for group in &args.groups {
        settings.begin_group(group);
    }

    match args.command {
        SettingsCommand::Get { key } => match settings.get(&key) {
            Some(value) => println!("{}", value),
            None => {
                eprintln!("Key '{}' not found", key);
                std::process::exit(1);
            }
        },

        SettingsCommand::Set { key, value, json } => {
            let existed = settings.contains(&key);
            settings.set(&key, parse_value(&value, json)?);
            if existed {
                println!("Updated key '{}'", key);
            } else {
                println!("Set key '{}'", key);
            }
        }

        SettingsCommand::Remove { key } => {
            if settings.contains(&key) {
                settings.remove(&key);
                println!("Removed '{}'", key);
            } else {
                println!("Key '{}' not found", key);
            }
        }

        SettingsCommand::Contains { key } => {
            if settings.contains(&key) {
                println!("yes");
            } else {
                println!("no");
                std::process::exit(1);
            }
        }

        SettingsCommand::Keys => {
            for group in settings.child_groups() {
                println!("{}/", group);
            }
            for key in settings.child_keys() {
                println!("{}", key);
            }
        }

        SettingsCommand::Stats => {
            for key in settings.all_keys() {
                let _ = settings.get(&key);
            }
            let stats = settings.stats();
            println!("Settings Statistics:");
            println!("  keys: {}", stats.size);
            println!("  store_reads: {}", stats.store_reads);
            println!("  store_errors: {}", stats.store_errors);
            println!("  hit_rate: {:.1}%", stats.hit_rate);
        }
    }

    Ok(())
}
