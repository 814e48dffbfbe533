//! Timer state machine
//!
//! Pure transition functions over the single timer instance. Nothing here
//! touches the clock, the network or storage: every operation returns a
//! [`Transition`] describing the side effects the controller has to carry
//! out, or `None` when the input was a no-op.
//!
//! ```text
//! Idle --start--> Running --pause/reset--> Idle
//!                 Running --tick to zero--> complete --> Idle (next phase)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::events::TimerAction;
use super::timer_config::{TimerConfig, TimerConfigInput};

/// Portion of a Pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Focus,
    Break,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::Break => "Break",
        }
    }

    fn toggled(self) -> Self {
        match self {
            Phase::Focus => Phase::Break,
            Phase::Break => Phase::Focus,
        }
    }
}

/// Opaque identifier of an external task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Build a task id from user input. Blank input and the `none`
    /// placeholder mean "no task".
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "none" {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status change to report to the task service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSignal {
    Start(TaskId),
    Complete(TaskId),
}

/// User-facing message requested when a phase ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseNotification {
    pub title: &'static str,
    pub body: &'static str,
}

impl PhaseNotification {
    fn for_completed(phase: Phase) -> Self {
        match phase {
            Phase::Focus => Self {
                title: "Session Complete!",
                body: "Time for a break!",
            },
            Phase::Break => Self {
                title: "Break Complete!",
                body: "Time to focus again.",
            },
        }
    }
}

/// Outcome of a state-changing input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: TimerAction,
    pub task_signal: Option<TaskSignal>,
    pub notification: Option<PhaseNotification>,
}

impl Transition {
    fn plain(action: TimerAction) -> Self {
        Self {
            action,
            task_signal: None,
            notification: None,
        }
    }
}

/// Result of a single countdown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Timer is idle; nothing happened.
    Idle,
    /// Still counting down.
    Counting(u64),
    /// The countdown hit zero and the phase completed.
    Completed(Transition),
}

/// Read-only view of the timer for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub running: bool,
    pub remaining_seconds: u64,
    pub phase_length_seconds: u64,
    pub completed_cycles: u32,
    pub total_cycles: u32,
    pub associated_task_id: Option<TaskId>,
    pub display: String,
    pub title: String,
    pub progress_percent: f64,
    pub config: TimerConfig,
}

#[derive(Debug, Clone)]
pub struct TimerState {
    phase: Phase,
    remaining_seconds: u64,
    running: bool,
    completed_cycles: u32,
    config: TimerConfig,
    associated_task_id: Option<TaskId>,
}

impl TimerState {
    /// Create an idle timer at the start of a focus phase.
    pub fn new(config: TimerConfig, associated_task_id: Option<TaskId>) -> Self {
        Self {
            phase: Phase::Focus,
            remaining_seconds: config.focus_seconds(),
            running: false,
            completed_cycles: 0,
            config,
            associated_task_id,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn associated_task_id(&self) -> Option<&TaskId> {
        self.associated_task_id.as_ref()
    }

    /// Full length of the current phase. A break is long when the number
    /// of completed cycles is a positive multiple of `cycles_per_long_break`.
    pub fn phase_length_seconds(&self) -> u64 {
        match self.phase {
            Phase::Focus => self.config.focus_seconds(),
            Phase::Break if self.is_long_break_due() => self.config.long_break_seconds(),
            Phase::Break => self.config.short_break_seconds(),
        }
    }

    fn is_long_break_due(&self) -> bool {
        self.completed_cycles > 0 && self.completed_cycles % self.config.cycles_per_long_break == 0
    }

    /// Elapsed share of the current phase, 0..=100.
    pub fn progress_percent(&self) -> f64 {
        let total = self.phase_length_seconds();
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.remaining_seconds);
        elapsed as f64 / total as f64 * 100.0
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }

    /// Window title, e.g. `24:59 - Focus`.
    pub fn title(&self) -> String {
        format!("{} - {}", self.display(), self.phase.as_str())
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            running: self.running,
            remaining_seconds: self.remaining_seconds,
            phase_length_seconds: self.phase_length_seconds(),
            completed_cycles: self.completed_cycles,
            total_cycles: self.config.cycles_per_long_break,
            associated_task_id: self.associated_task_id.clone(),
            display: self.display(),
            title: self.title(),
            progress_percent: self.progress_percent(),
            config: self.config,
        }
    }

    pub fn start(&mut self) -> Option<Transition> {
        if self.running {
            return None;
        }
        self.running = true;

        let task_signal = match (&self.associated_task_id, self.phase) {
            (Some(task), Phase::Focus) => Some(TaskSignal::Start(task.clone())),
            _ => None,
        };
        Some(Transition {
            task_signal,
            ..Transition::plain(TimerAction::Start)
        })
    }

    pub fn pause(&mut self) -> Option<Transition> {
        if !self.running {
            return None;
        }
        self.running = false;
        Some(Transition::plain(TimerAction::Pause))
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            Tick::Completed(self.complete())
        } else {
            Tick::Counting(self.remaining_seconds)
        }
    }

    /// Finish the current phase and prepare the next one. The timer is
    /// left idle; the next phase needs an explicit `start()`.
    pub fn complete(&mut self) -> Transition {
        self.running = false;
        let finished = self.phase;
        self.phase = finished.toggled();

        let mut task_signal = None;
        if finished == Phase::Focus {
            self.completed_cycles = self.completed_cycles.saturating_add(1);
            if self.completed_cycles == self.config.cycles_per_long_break {
                task_signal = self.associated_task_id.take().map(TaskSignal::Complete);
            }
        }

        self.remaining_seconds = self.phase_length_seconds();

        Transition {
            action: TimerAction::Complete,
            task_signal,
            notification: Some(PhaseNotification::for_completed(finished)),
        }
    }

    pub fn reset(&mut self) -> Transition {
        self.running = false;
        self.remaining_seconds = self.phase_length_seconds();
        Transition::plain(TimerAction::Reset)
    }

    /// Start over from the first focus phase of a new set.
    pub fn reset_cycles(&mut self) -> Transition {
        self.completed_cycles = 0;
        self.phase = Phase::Focus;
        self.reset()
    }

    /// Apply new settings; invalid fields fall back to their defaults.
    pub fn update_config(&mut self, input: &TimerConfigInput) -> (TimerConfig, Transition) {
        self.config = input.sanitize();
        let transition = self.reset();
        (self.config, transition)
    }

    pub fn select_task(&mut self, task: Option<TaskId>) -> Transition {
        self.associated_task_id = task;
        Transition::plain(TimerAction::TaskSelected)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(TimerConfig::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(id: &str) -> TaskId {
        TaskId::parse(id).unwrap()
    }

    fn run_until_complete(timer: &mut TimerState) -> (u64, Transition) {
        timer.start();
        let mut ticks = 0;
        loop {
            ticks += 1;
            match timer.tick() {
                Tick::Counting(_) => {}
                Tick::Completed(transition) => return (ticks, transition),
                Tick::Idle => panic!("timer stopped without completing"),
            }
        }
    }

    #[test]
    fn new_timer_is_idle_focus() {
        let timer = TimerState::default();
        assert_eq!(timer.phase(), Phase::Focus);
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 1500);
        assert_eq!(timer.completed_cycles(), 0);
    }

    #[test]
    fn full_focus_phase_moves_to_short_break() {
        let mut timer = TimerState::default();
        let (ticks, transition) = run_until_complete(&mut timer);

        assert_eq!(ticks, 1500);
        assert_eq!(transition.action, TimerAction::Complete);
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.remaining_seconds(), 300);
        assert_eq!(timer.completed_cycles(), 1);
        assert!(!timer.is_running());
        assert_eq!(
            transition.notification,
            Some(PhaseNotification {
                title: "Session Complete!",
                body: "Time for a break!",
            })
        );
    }

    #[test]
    fn countdown_never_goes_below_zero() {
        let config = TimerConfig {
            focus_minutes: 1,
            ..TimerConfig::default()
        };
        let mut timer = TimerState::new(config, None);
        timer.reset();
        timer.start();

        let mut seen_zero = false;
        for _ in 0..500 {
            match timer.tick() {
                Tick::Completed(_) => {
                    seen_zero = true;
                    break;
                }
                Tick::Counting(remaining) => assert!(remaining > 0),
                Tick::Idle => unreachable!(),
            }
        }
        assert!(seen_zero);
        assert_eq!(timer.tick(), Tick::Idle);
        assert!(timer.remaining_seconds() <= timer.phase_length_seconds());
    }

    #[test]
    fn fourth_cycle_grants_long_break_and_completes_task() {
        let mut timer = TimerState::new(TimerConfig::default(), Some(task("42")));
        for _ in 0..3 {
            run_until_complete(&mut timer);
            assert_eq!(timer.remaining_seconds(), 300);
            run_until_complete(&mut timer);
        }
        assert_eq!(timer.completed_cycles(), 3);
        assert_eq!(timer.phase(), Phase::Focus);

        let (_, transition) = run_until_complete(&mut timer);
        assert_eq!(timer.completed_cycles(), 4);
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.remaining_seconds(), 900);
        assert_eq!(transition.task_signal, Some(TaskSignal::Complete(task("42"))));
        assert_eq!(timer.associated_task_id(), None);
    }

    #[test]
    fn break_completion_does_not_count_a_cycle() {
        let mut timer = TimerState::default();
        run_until_complete(&mut timer);
        let (_, transition) = run_until_complete(&mut timer);

        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.completed_cycles(), 1);
        assert_eq!(timer.remaining_seconds(), 1500);
        assert_eq!(transition.notification.unwrap().title, "Break Complete!");
    }

    #[test]
    fn start_is_idempotent() {
        let mut timer = TimerState::new(TimerConfig::default(), Some(task("7")));
        let first = timer.start().unwrap();
        assert_eq!(first.task_signal, Some(TaskSignal::Start(task("7"))));
        assert!(timer.start().is_none());
        assert!(timer.is_running());
    }

    #[test]
    fn start_during_break_does_not_signal_task() {
        let mut timer = TimerState::new(TimerConfig::default(), Some(task("7")));
        run_until_complete(&mut timer);
        let transition = timer.start().unwrap();
        assert_eq!(transition.task_signal, None);
    }

    #[test]
    fn pause_while_idle_is_noop() {
        let mut timer = TimerState::default();
        let before = timer.snapshot();
        assert!(timer.pause().is_none());
        assert_eq!(timer.snapshot(), before);
    }

    #[test]
    fn pause_keeps_remaining_time() {
        let mut timer = TimerState::default();
        timer.start();
        timer.tick();
        timer.tick();
        assert_eq!(timer.pause().unwrap().action, TimerAction::Pause);
        assert_eq!(timer.remaining_seconds(), 1498);
        assert_eq!(timer.tick(), Tick::Idle);
        assert_eq!(timer.remaining_seconds(), 1498);
    }

    #[test]
    fn reset_restores_full_phase_and_stops() {
        let mut timer = TimerState::default();
        timer.start();
        timer.tick();
        let transition = timer.reset();
        assert_eq!(transition.action, TimerAction::Reset);
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 1500);
    }

    #[test]
    fn reset_in_long_break_uses_long_break_length() {
        let config = TimerConfig {
            cycles_per_long_break: 1,
            ..TimerConfig::default()
        };
        let mut timer = TimerState::new(config, None);
        run_until_complete(&mut timer);
        timer.start();
        timer.tick();
        timer.reset();
        assert_eq!(timer.remaining_seconds(), 900);
    }

    #[test]
    fn cycles_past_the_set_only_long_break_on_multiples() {
        let config = TimerConfig {
            focus_minutes: 1,
            cycles_per_long_break: 2,
            ..TimerConfig::default()
        };
        let mut timer = TimerState::new(config, None);
        let mut break_lengths = Vec::new();
        for _ in 0..4 {
            run_until_complete(&mut timer);
            break_lengths.push(timer.remaining_seconds());
            run_until_complete(&mut timer);
        }
        assert_eq!(break_lengths, vec![300, 900, 300, 900]);
    }

    #[test]
    fn task_completion_fires_only_once_per_set() {
        let config = TimerConfig {
            focus_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 1,
            cycles_per_long_break: 1,
        };
        let mut timer = TimerState::new(config, Some(task("a")));
        let (_, first) = run_until_complete(&mut timer);
        assert!(matches!(first.task_signal, Some(TaskSignal::Complete(_))));

        run_until_complete(&mut timer);
        timer.select_task(Some(task("b")));
        let (_, second) = run_until_complete(&mut timer);
        assert_eq!(second.task_signal, None);
        assert_eq!(timer.associated_task_id(), Some(&task("b")));
    }

    #[test]
    fn update_config_sanitizes_and_resets() {
        let mut timer = TimerState::default();
        timer.start();
        timer.tick();
        let input: TimerConfigInput =
            serde_json::from_value(json!({ "focusMinutes": -5, "shortBreakMinutes": 10 })).unwrap();
        let (config, transition) = timer.update_config(&input);

        assert_eq!(config.focus_minutes, 25);
        assert_eq!(config.short_break_minutes, 10);
        assert_eq!(transition.action, TimerAction::Reset);
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 1500);
    }

    #[test]
    fn reset_cycles_returns_to_first_focus() {
        let mut timer = TimerState::default();
        run_until_complete(&mut timer);
        timer.reset_cycles();
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.completed_cycles(), 0);
        assert_eq!(timer.remaining_seconds(), 1500);
    }

    #[test]
    fn task_id_placeholders_mean_no_task() {
        assert_eq!(TaskId::parse(""), None);
        assert_eq!(TaskId::parse("  "), None);
        assert_eq!(TaskId::parse("none"), None);
        assert_eq!(TaskId::parse(" 12 ").unwrap().as_str(), "12");
    }

    #[test]
    fn display_and_progress() {
        let mut timer = TimerState::default();
        assert_eq!(timer.display(), "25:00");
        assert_eq!(timer.progress_percent(), 0.0);
        timer.start();
        for _ in 0..750 {
            timer.tick();
        }
        assert_eq!(timer.title(), "12:30 - Focus");
        assert!((timer.progress_percent() - 50.0).abs() < f64::EPSILON);
    }
}
