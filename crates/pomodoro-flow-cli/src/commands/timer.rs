use clap::Subcommand;

use super::open_timer;
use crate::desktop::DesktopNotifier;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the current interval (resumes if paused)
    Start,
    /// Pause and remember the remaining time
    Pause,
    /// Resume a paused interval
    Resume,
    /// Stop and reload the current interval
    Stop,
    /// Print the current timer view as JSON
    Status,
}

/// Apply one control operation and print the resulting event, or the
/// current view when the operation was a no-op.
///
/// Alerts scheduled here belong to this process and are dropped when it
/// exits; the recorded fire date still lets later invocations see how much
/// time is left. Use `pomodoro-flow run` for alerts.
pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut timer = open_timer(DesktopNotifier::new())?;

    let event = match action {
        TimerAction::Start => timer.start()?,
        TimerAction::Pause => timer.pause()?,
        TimerAction::Resume => timer.resume()?,
        TimerAction::Stop => timer.stop()?,
        TimerAction::Status => None,
    };

    match event {
        Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
        None => println!("{}", serde_json::to_string_pretty(&timer.view()?)?),
    }
    Ok(())
}
