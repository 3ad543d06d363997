use std::sync::Arc;

use clap::Subcommand;
use pomodoro_flow_core::storage::MAX_HISTORY_DAYS;
use pomodoro_flow_core::{Settings, SqliteStore, StateStore, SystemClock};
use serde::Serialize;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's count against the daily target
    Today,
    /// Per-day counts, most recent first
    History {
        #[arg(
            long,
            default_value = "7",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_DAYS))
        )]
        days: u32,
    },
}

#[derive(Serialize)]
struct TodayStats {
    date: String,
    pomodoros: u32,
    target: u32,
    remaining_to_target: u32,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = StateStore::new(Box::new(SqliteStore::open()?), Arc::new(SystemClock));

    match action {
        StatsAction::Today => {
            let target = Settings::load()?.timer.target_pomodoros;
            let today = store
                .history(1)?
                .into_iter()
                .next()
                .ok_or("could not determine today's date")?;
            let stats = TodayStats {
                remaining_to_target: target.saturating_sub(today.count),
                date: today.date,
                pomodoros: today.count,
                target,
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::History { days } => {
            let history = store.history(days)?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }
    Ok(())
}
