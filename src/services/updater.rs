//! Monitoring updater service
//!
//! Owns the engine behind a single lock, receives device model change
//! notifications, and drives the periodic timer on a background thread.
//! The sink is always invoked outside the engine lock.

use crate::device_model::{
    ChangeNotifier, ConnectivityStatus, DeviceModel, MonitorUpdate, VariableChange,
    VariableListener,
};
use crate::domain::EventId;
use crate::monitoring::{EngineConfig, EventSink, MonitorEngine};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// Longest uninterrupted sleep of the timer thread
const STOP_POLL: Duration = Duration::from_millis(50);

/// Configuration for the updater
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Interval between periodic sweeps
    pub sweep_interval: Duration,
    /// Engine behaviour
    pub engine: EngineConfig,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(1),
            engine: EngineConfig::default(),
        }
    }
}

/// State shared between the owner, the timer thread and the device model
struct Shared<M: DeviceModel> {
    engine: Mutex<MonitorEngine<M>>,
}

impl<M: DeviceModel> Shared<M> {
    fn lock(&self) -> MutexGuard<'_, MonitorEngine<M>> {
        self.engine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// One processing pass, with an optional sweep first
    fn run_pass(&self, sweep: bool, allow_periodic: bool, allow_trigger: bool) {
        let (batch, sink) = {
            let mut engine = self.lock();
            if sweep {
                engine.sweep(Instant::now(), SystemTime::now());
            }
            (
                engine.prepare_batch(allow_periodic, allow_trigger),
                engine.sink(),
            )
        };
        let Some(batch) = batch else {
            return;
        };
        let result = if batch.is_empty() {
            Ok(())
        } else {
            sink.notify(batch.events())
        };
        self.lock().complete_batch(batch, result);
    }
}

impl<M: DeviceModel> VariableListener for Shared<M> {
    fn on_variable_changed(&self, change: &VariableChange<'_>) {
        self.lock().on_variable_changed(change);
    }

    fn on_monitor_updated(&self, update: &MonitorUpdate<'_>) {
        self.lock()
            .on_monitor_updated(update, Instant::now(), SystemTime::now());
    }
}

/// Monitoring updater
pub struct MonitoringUpdater<M: DeviceModel + 'static> {
    shared: Arc<Shared<M>>,
    config: UpdaterConfig,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Timer thread handle
    handle: Option<thread::JoinHandle<()>>,
}

impl<M: DeviceModel + ChangeNotifier + 'static> MonitoringUpdater<M> {
    /// Create an updater and subscribe it to the device model (timer not started)
    pub fn new(
        device_model: Arc<M>,
        sink: Arc<dyn EventSink>,
        connectivity: Arc<dyn ConnectivityStatus>,
        config: UpdaterConfig,
    ) -> Self {
        let engine = MonitorEngine::new(
            Arc::clone(&device_model),
            sink,
            connectivity,
            config.engine.clone(),
        );
        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
        });
        let listener = Arc::downgrade(&shared) as Weak<dyn VariableListener>;
        device_model.subscribe(listener);

        Self {
            shared,
            config,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl<M: DeviceModel + 'static> MonitoringUpdater<M> {
    /// Check if the timer is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the periodic timer; no-op if already running
    pub fn start_monitoring(&mut self) {
        if self.is_running() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let running = Arc::clone(&self.running);
        let interval = self.config.sweep_interval;

        let handle = thread::spawn(move || {
            log::info!("Monitoring timer started ({:?} interval)", interval);
            while running.load(Ordering::SeqCst) {
                shared.run_pass(true, true, true);
                sleep_while_running(&running, interval);
            }
            log::info!("Monitoring timer stopped");
        });
        self.handle = Some(handle);
    }

    /// Stop the periodic timer and wait for an in-flight sweep
    pub fn stop_monitoring(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Monitoring timer thread panicked");
            }
        }
    }

    /// Sweep and process once on the caller's thread
    pub fn tick(&self) {
        self.shared.run_pass(true, true, true);
    }

    /// Report trigger monitors now that the caller's change settled
    pub fn process_triggered_monitors(&self) {
        self.shared.run_pass(false, false, true);
    }

    /// Forward delivery confirmations from the messaging layer
    pub fn confirm_delivery(&self, event_ids: &[EventId]) {
        self.shared.lock().confirm_delivery(event_ids);
    }

    /// Run `f` with the engine locked
    pub fn with_engine<R>(&self, f: impl FnOnce(&MonitorEngine<M>) -> R) -> R {
        f(&self.shared.lock())
    }

    /// Get the updater configuration
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }
}

impl<M: DeviceModel + 'static> Drop for MonitoringUpdater<M> {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(STOP_POLL));
    }
}
