//! Countdown background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, error, info};

use crate::state::{AppState, Tick};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background task that ticks the timer once per second while it runs.
///
/// This is the only source of ticks in the process. Starting an already
/// running timer does not touch the running flag, so a second countdown
/// can never be created.
pub async fn countdown_task(state: Arc<AppState>) {
    info!("Starting countdown task");

    let mut running_rx = state.watch_running();

    loop {
        // Wait for the timer to be started
        while !*running_rx.borrow_and_update() {
            if running_rx.changed().await.is_err() {
                debug!("Running flag closed, stopping countdown task");
                return;
            }
        }

        debug!("Countdown started");
        let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match state.tick() {
                        Ok(Tick::Counting(remaining)) => {
                            debug!("Countdown tick: {}s remaining", remaining);
                        }
                        Ok(Tick::Completed(transition)) => {
                            info!("Phase complete: {:?}", transition.notification);
                            break;
                        }
                        Ok(Tick::Idle) => break,
                        Err(e) => {
                            error!("Failed to tick timer: {}", e);
                            // Wait a bit before retrying
                            sleep(TICK_PERIOD).await;
                            break;
                        }
                    }
                }

                changed = running_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *running_rx.borrow_and_update() {
                        // Paused and resumed between two ticks
                        interval.reset();
                    } else {
                        debug!("Countdown stopped");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::{DisabledTaskService, MemoryStore},
        state::{Phase, TimerAction, TimerConfigInput},
    };
    use serde_json::json;

    fn spawn_state() -> Arc<AppState> {
        let state = Arc::new(AppState::new(
            "127.0.0.1".to_string(),
            0,
            Arc::new(MemoryStore::new()),
            Arc::new(DisabledTaskService),
            None,
        ));
        tokio::spawn(countdown_task(Arc::clone(&state)));
        state
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_while_running() {
        let state = spawn_state();
        state.start().unwrap();

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(state.snapshot().unwrap().remaining_seconds, 1497);

        state.pause().unwrap();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(state.snapshot().unwrap().remaining_seconds, 1497);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_runs_a_single_countdown() {
        let state = spawn_state();
        state.start().unwrap();
        state.start().unwrap();

        sleep(Duration::from_millis(5500)).await;
        assert_eq!(state.snapshot().unwrap().remaining_seconds, 1495);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_the_countdown() {
        let state = spawn_state();
        state.start().unwrap();
        sleep(Duration::from_millis(2500)).await;

        state.reset().unwrap();
        sleep(Duration::from_secs(5)).await;

        let snapshot = state.snapshot().unwrap();
        assert!(!snapshot.running);
        assert_eq!(snapshot.remaining_seconds, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn completes_phase_and_waits_for_next_start() {
        let state = spawn_state();
        let input: TimerConfigInput =
            serde_json::from_value(json!({ "focusMinutes": 1, "shortBreakMinutes": 2 })).unwrap();
        state.update_config(&input).unwrap();
        let mut events = state.subscribe_events();

        state.start().unwrap();
        sleep(Duration::from_millis(60_500)).await;

        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.phase, Phase::Break);
        assert_eq!(snapshot.remaining_seconds, 120);
        assert_eq!(snapshot.completed_cycles, 1);
        assert!(!snapshot.running);

        assert_eq!(events.recv().await.unwrap().action, TimerAction::Start);
        assert_eq!(events.recv().await.unwrap().action, TimerAction::Complete);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(state.snapshot().unwrap().remaining_seconds, 120);

        state.start().unwrap();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(state.snapshot().unwrap().remaining_seconds, 119);
    }
}
