use clap::Subcommand;
use pomodoro_flow_core::Settings;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a setting (e.g. "timer.pomodoro_length", "notifications.enabled")
    Get {
        /// Dot-separated key
        key: String,
    },
    /// Set a setting
    Set {
        /// Dot-separated key
        key: String,
        /// New value; lengths are in seconds
        value: String,
    },
    /// List all settings
    List,
    /// Reset settings to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let settings = Settings::load()?;
            match settings.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load()?;
            settings.set(&key, &value)?;
            settings.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let settings = Settings::load()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Reset => {
            Settings::default().save()?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
