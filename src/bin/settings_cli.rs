//! settings_cli - drive the settings form from the command line

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::Arc;

use vigil::{
    InMemoryThemeProvider, LogNotifier, PreferenceChange, SettingsForm, ThemeMode,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Control change as key=value, e.g. alertThreshold=high. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    changes: Vec<String>,
    /// Switch dark mode on or off.
    #[arg(long)]
    dark_mode: Option<bool>,
    /// Press "Save Changes" after applying the changes.
    #[arg(long)]
    save: bool,
    /// Print the page sections instead of JSON.
    #[arg(long)]
    sections: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let theme = Arc::new(InMemoryThemeProvider::new(ThemeMode::Dark));
    let mut form = SettingsForm::new(theme, Arc::new(LogNotifier));

    for raw in &args.changes {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", raw))?;
        form.apply(PreferenceChange::parse(key.trim(), value)?);
    }
    if let Some(enabled) = args.dark_mode {
        form.set_dark_mode(enabled);
    }
    if args.save {
        form.save();
    }

    if args.sections {
        for section in form.preferences().sections() {
            println!("[{}]", section.title);
            for control in section.controls {
                println!("  {:<28} {:<12} {}", control.label, control.value, control.description);
            }
        }
    } else {
        println!("{}", serde_json::to_string_pretty(form.preferences())?);
    }
    Ok(())
}
