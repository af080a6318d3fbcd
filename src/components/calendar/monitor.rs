use crate::components::calendar::CalendarApi;
use crate::components::SessionContext;
use crate::config::Config;
use lazy_static::lazy_static;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::{info, warn};

lazy_static! {
    static ref MONITOR_INSTANCES: AtomicU32 = AtomicU32::new(0);
    static ref MONITOR_TASK_RUNNING: AtomicBool = AtomicBool::new(false);
}

/// Host-side sink for connection-state notifications.
///
/// Called at most once per observed connected-to-disconnected edge;
/// staying disconnected across ticks never re-notifies.
pub trait ConnectivityNotifier: Send + Sync {
    fn calendar_disconnected(&self);
}

/// What one observation means relative to the previous one
#[derive(Debug, PartialEq, Eq)]
enum Transition {
    Lost,
    Restored,
    Unchanged,
}

fn classify_transition(previous: Option<bool>, connected: bool) -> Transition {
    match (previous, connected) {
        (Some(true), false) => Transition::Lost,
        (Some(false), true) => Transition::Restored,
        // Startup observations are a baseline, not an edge
        _ => Transition::Unchanged,
    }
}

/// Start the connection monitor
pub async fn start_monitor(
    session: &SessionContext,
    config: Arc<RwLock<Config>>,
    calendar: Arc<dyn CalendarApi>,
) {
    // Increment instance counter and log
    let instance_count = MONITOR_INSTANCES.fetch_add(1, Ordering::SeqCst) + 1;
    if instance_count > 1 {
        warn!(
            "Multiple connection monitors detected! Instance count: {}",
            instance_count
        );
    }
    info!("Starting connection monitor (instance {})", instance_count);

    // Read config values
    let config_read = config.read().await;
    let interval_secs = config_read.connection_check_interval_secs;
    drop(config_read);

    // Only spawn the monitor task if it's not already running
    if !MONITOR_TASK_RUNNING.swap(true, Ordering::SeqCst) {
        info!("Starting connection monitor task");

        let notifier = Arc::clone(&session.notifier);

        // Spawn the monitor task
        tokio::spawn(async move {
            run_monitor_loop(notifier, calendar, interval_secs).await;
        });
    } else {
        warn!("Connection monitor task is already running, skipping initialization");
    }
}

/// Main monitor loop observing connection state on a fixed interval
async fn run_monitor_loop(
    notifier: Arc<dyn ConnectivityNotifier>,
    calendar: Arc<dyn CalendarApi>,
    interval_secs: u64,
) {
    let mut last_observed: Option<bool> = None;

    loop {
        match calendar.check_connection().await {
            Ok(connected) => {
                match classify_transition(last_observed, connected) {
                    Transition::Lost => {
                        warn!("Calendar connection lost");
                        notifier.calendar_disconnected();
                    }
                    Transition::Restored => {
                        info!("Calendar connection restored");
                    }
                    Transition::Unchanged => {}
                }
                last_observed = Some(connected);
            }
            Err(e) => {
                // Indeterminate observation; keep the last known state
                // rather than raising a false disconnect
                warn!("Connection check failed: {:?}", e);
            }
        }

        sleep(TokioDuration::from_secs(interval_secs)).await;
    }
}
