//! Main application state management
//!
//! `AppState` owns the single timer instance and turns the pure transitions
//! of [`TimerState`] into effects: events on the broadcast channels, the
//! running flag the countdown task watches, persistence writes and
//! fire-and-forget calls to the task service.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Instant,
};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::{
    events::{Notice, TimerAction, TimerEvent},
    timer_config::{TimerConfig, TimerConfigInput},
    timer_state::{PhaseNotification, TaskId, TaskSignal, Tick, TimerSnapshot, TimerState, Transition},
};
use crate::{
    error::{Result, TimerError},
    services::{
        store::{self, KeyValueStore},
        Notifier, TaskService, TaskStatus,
    },
};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Controller for the timer and its collaborators.
pub struct AppState {
    timer: Mutex<TimerState>,
    /// Transition events for observers
    event_tx: broadcast::Sender<TimerEvent>,
    /// Transient notices (toasts, phase notifications)
    notice_tx: broadcast::Sender<Notice>,
    /// Running flag driving the countdown task
    running_tx: watch::Sender<bool>,
    /// Latest snapshot, updated on every tick and transition
    snapshot_tx: watch::Sender<TimerSnapshot>,
    /// Bumped whenever the associated task changes; task service responses
    /// carrying an older value are discarded.
    association_generation: Arc<AtomicU64>,
    task_service: Arc<dyn TaskService>,
    store: Arc<dyn KeyValueStore>,
    notifier: Option<Arc<dyn Notifier>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    /// Create the controller, restoring settings and the associated task
    /// from the store.
    pub fn new(
        host: String,
        port: u16,
        store: Arc<dyn KeyValueStore>,
        task_service: Arc<dyn TaskService>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let config = store::load_config(&*store);
        let task = store::load_task(&*store);
        if let Some(task) = &task {
            info!("Restored associated task {}", task);
        }

        let timer = TimerState::new(config, task);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (notice_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (running_tx, _) = watch::channel(false);
        let (snapshot_tx, _) = watch::channel(timer.snapshot());

        Self {
            timer: Mutex::new(timer),
            event_tx,
            notice_tx,
            running_tx,
            snapshot_tx,
            association_generation: Arc::new(AtomicU64::new(0)),
            task_service,
            store,
            notifier,
            start_time: Instant::now(),
            port,
            host,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.event_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    pub fn watch_running(&self) -> watch::Receiver<bool> {
        self.running_tx.subscribe()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn lock_timer(&self) -> Result<MutexGuard<'_, TimerState>> {
        self.timer
            .lock()
            .map_err(|_| TimerError::LockPoisoned("timer state"))
    }

    /// Get current timer snapshot
    pub fn snapshot(&self) -> Result<TimerSnapshot> {
        Ok(self.lock_timer()?.snapshot())
    }

    pub fn config(&self) -> Result<TimerConfig> {
        Ok(*self.lock_timer()?.config())
    }

    /// Run `op` on the timer and publish its result while the lock is
    /// held, so observers see transitions in the order they happened.
    /// Effects that may block or await run after the lock is released.
    fn apply<F, R>(&self, op: F) -> Result<(R, Option<Effects>)>
    where
        F: FnOnce(&mut TimerState) -> (R, Option<Transition>),
    {
        let mut timer = self.lock_timer()?;
        let (output, transition) = op(&mut *timer);

        let running = timer.is_running();
        self.running_tx.send_if_modified(|current| {
            let changed = *current != running;
            *current = running;
            changed
        });
        self.snapshot_tx.send_replace(timer.snapshot());

        let effects = transition.map(|transition| {
            let event = TimerEvent::from_state(transition.action, &*timer);
            debug!("Timer event: {:?}", event);
            // Nobody listening is fine.
            let _ = self.event_tx.send(event);

            let association_changed = transition.action == TimerAction::TaskSelected
                || matches!(transition.task_signal, Some(TaskSignal::Complete(_)));
            let generation = if association_changed {
                self.association_generation.fetch_add(1, Ordering::SeqCst) + 1
            } else {
                self.association_generation.load(Ordering::SeqCst)
            };
            Effects {
                transition,
                generation,
            }
        });

        Ok((output, effects))
    }

    fn transition<F>(&self, op: F) -> Result<TimerSnapshot>
    where
        F: FnOnce(&mut TimerState) -> Option<Transition>,
    {
        let (snapshot, effects) = self.apply(|timer| {
            let transition = op(timer);
            (timer.snapshot(), transition)
        })?;
        if let Some(effects) = effects {
            self.run_effects(effects);
        }
        Ok(snapshot)
    }

    /// Start the countdown. No-op when already running.
    pub fn start(&self) -> Result<TimerSnapshot> {
        self.transition(|timer| timer.start())
    }

    /// Pause the countdown. No-op when idle.
    pub fn pause(&self) -> Result<TimerSnapshot> {
        self.transition(|timer| timer.pause())
    }

    pub fn reset(&self) -> Result<TimerSnapshot> {
        self.transition(|timer| Some(timer.reset()))
    }

    pub fn reset_cycles(&self) -> Result<TimerSnapshot> {
        self.transition(|timer| Some(timer.reset_cycles()))
    }

    /// Called once per second by the countdown task.
    pub fn tick(&self) -> Result<Tick> {
        let (tick, effects) = self.apply(|timer| {
            let tick = timer.tick();
            let transition = match &tick {
                Tick::Completed(transition) => Some(transition.clone()),
                _ => None,
            };
            (tick, transition)
        })?;
        if let Some(effects) = effects {
            self.run_effects(effects);
        }
        Ok(tick)
    }

    /// Force the current phase to end now.
    pub fn complete(&self) -> Result<TimerSnapshot> {
        self.transition(|timer| Some(timer.complete()))
    }

    /// Apply and persist new settings. Invalid fields fall back to their
    /// defaults.
    pub fn update_config(&self, input: &TimerConfigInput) -> Result<TimerConfig> {
        let (config, effects) = self.apply(|timer| {
            let (config, transition) = timer.update_config(input);
            (config, Some(transition))
        })?;
        info!("Timer settings updated: {:?}", config);

        if let Err(e) = store::save_config(self.store.as_ref(), &config) {
            warn!("Failed to persist timer settings: {}", e);
        }
        if let Some(effects) = effects {
            self.run_effects(effects);
        }
        Ok(config)
    }

    /// Associate a task with the current and future sessions.
    pub fn select_task(&self, task: Option<TaskId>) -> Result<TimerSnapshot> {
        let (snapshot, effects) = self.apply(|timer| {
            let transition = timer.select_task(task.clone());
            (timer.snapshot(), Some(transition))
        })?;

        match &task {
            Some(task) => info!("Associated task {}", task),
            None => info!("Cleared associated task"),
        }
        if let Err(e) = store::save_task(self.store.as_ref(), task.as_ref()) {
            warn!("Failed to persist associated task: {}", e);
        }
        if let Some(effects) = effects {
            self.run_effects(effects);
        }
        Ok(snapshot)
    }

    fn run_effects(&self, effects: Effects) {
        let Effects {
            transition,
            generation,
        } = effects;

        match transition.task_signal {
            Some(TaskSignal::Start(task)) => {
                self.spawn_task_update(task, TaskStatus::InProgress, generation);
            }
            Some(TaskSignal::Complete(task)) => {
                if let Err(e) = store::save_task(self.store.as_ref(), None) {
                    warn!("Failed to clear persisted task: {}", e);
                }
                self.spawn_task_update(task, TaskStatus::Completed, generation);
            }
            None => {}
        }

        if let Some(notification) = transition.notification {
            self.notify_phase_end(notification);
        }
    }

    fn notify_phase_end(&self, notification: PhaseNotification) {
        let notice = Notice::info(notification.title, notification.body);
        info!("{} {}", notice.title, notice.message);

        if let Some(notifier) = &self.notifier {
            let notifier = Arc::clone(notifier);
            let notice = notice.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(e) = notifier.notify(&notice) {
                    warn!("{}", e);
                }
            });
        }
        let _ = self.notice_tx.send(notice);
    }

    /// Report a task status change without blocking the timer. Failures
    /// are logged and surfaced as a notice, never retried.
    fn spawn_task_update(&self, task: TaskId, status: TaskStatus, generation: u64) {
        let service = Arc::clone(&self.task_service);
        let current_generation = Arc::clone(&self.association_generation);
        let notice_tx = self.notice_tx.clone();

        tokio::spawn(async move {
            let outcome = service.update_status(&task, status).await;

            if current_generation.load(Ordering::SeqCst) != generation {
                debug!(
                    "Discarding stale {:?} response for task {}: association changed",
                    status, task
                );
                return;
            }

            let notice = match outcome {
                Ok(true) => Notice::success(match status {
                    TaskStatus::InProgress => "Task started",
                    TaskStatus::Completed => "Task completed successfully!",
                }),
                Ok(false) => {
                    warn!("Task service did not accept {:?} for task {}", status, task);
                    Notice::error("Error updating task")
                }
                Err(e) => {
                    warn!("Error updating task {}: {}", task, e);
                    Notice::error("Error updating task")
                }
            };
            let _ = notice_tx.send(notice);
        });
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

/// Side effects of one transition, carried out after the timer lock is
/// released.
struct Effects {
    transition: Transition,
    generation: u64,
}
