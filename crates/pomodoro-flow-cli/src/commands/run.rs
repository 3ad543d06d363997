use std::io::Write;
use std::time::Duration;

use pomodoro_flow_core::timer::format_countdown;
use pomodoro_flow_core::{CycleState, Event, TimerDriver};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use super::open_timer;
use crate::desktop::DesktopNotifier;

/// How long to wait for the end-of-interval alert before exiting.
const ALERT_GRACE: Duration = Duration::from_secs(2);

/// Count down in the foreground. Ctrl-C pauses and exits; the interval can
/// be resumed later with `timer resume` or another `run`.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let notifier = DesktopNotifier::new();
    let timer = open_timer(notifier.clone())?;
    let (driver, handle) = TimerDriver::spawn(timer);
    let mut events = driver.subscribe();

    let view = driver.start().await?;
    print_line(view.state, view.remaining_secs)?;

    let mut completed = false;
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(Event::Tick { state, remaining_secs }) => {
                    print_line(state, remaining_secs)?;
                }
                Ok(event @ Event::IntervalCompleted { .. }) => {
                    println!();
                    println!("{}", serde_json::to_string_pretty(&event)?);
                    completed = true;
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => info!(skipped, "display fell behind"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let view = driver.pause().await?;
                println!();
                println!("{}", serde_json::to_string_pretty(&view)?);
                break;
            }
        }
    }

    driver.shutdown().await?;
    handle.await?;
    if completed {
        notifier.drain(ALERT_GRACE).await;
    }
    Ok(())
}

fn print_line(state: CycleState, remaining_secs: u64) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "\r{state:<10} {}", format_countdown(remaining_secs))?;
    stdout.flush()
}
