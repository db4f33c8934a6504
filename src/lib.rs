pub mod bridge;
pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod models;
pub mod monitor;
pub mod notice;
pub mod platform;
pub mod signals;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tracker;
pub mod validation;

use crate::bridge::PermissionBridge;
use crate::clock::{Clock, SystemClock, ThreadScheduler};
use crate::config::MonitorConfig;
use crate::db::{migrations, Database};
use crate::error::AppError;
use crate::monitor::LockMonitor;
use crate::notice::NoticeManager;
use crate::platform::{HomeRedirect, NativePlatform, NoticeSurface, PermissionProbe, PlatformTracker};
use crate::signals::LifecycleSignal;
use crate::store::SqliteLockStore;
use crate::tracker::TrackerService;
use log::{error, info, warn};
use std::sync::{mpsc, Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Error type for Zensta initialization failures
#[derive(Debug)]
pub enum InitError {
    Config(AppError),
    DataDirCreation(AppError),
    DatabaseOpen(rusqlite::Error),
    Migration(rusqlite::Error),
    Signals(std::io::Error),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::Config(e) => write!(f, "Failed to load configuration: {e}"),
            InitError::DataDirCreation(e) => write!(f, "Could not create data directory: {e}"),
            InitError::DatabaseOpen(e) => write!(f, "Failed to open database: {e}"),
            InitError::Migration(e) => write!(f, "Failed to run database migrations: {e}"),
            InitError::Signals(e) => write!(f, "Failed to install signal handlers: {e}"),
        }
    }
}

impl std::error::Error for InitError {}

/// Install the log subscriber. Output goes to stderr so the bridge can keep
/// stdout for its protocol. `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if installed.is_err() {
        warn!("Log subscriber already installed");
    }
}

fn open_database(config: &MonitorConfig) -> Result<Database, InitError> {
    let db = match config
        .resolve_database_path()
        .map_err(InitError::DataDirCreation)?
    {
        Some(path) => {
            info!("Using lock database at {}", path.display());
            Database::open(&path).map_err(InitError::DatabaseOpen)?
        }
        None => {
            warn!("No data directory available, locks will not persist");
            Database::open_in_memory().map_err(InitError::DatabaseOpen)?
        }
    };
    migrations::run(db.connection()).map_err(InitError::Migration)?;
    Ok(db)
}

/// Apply a process signal: interrupt clears the screen, stop ends the
/// foreground event stream so the monitor tears down.
pub fn handle_signal(monitor: &LockMonitor, tracker: &TrackerService, signal: LifecycleSignal) {
    match signal {
        LifecycleSignal::Interrupt => monitor.on_interrupt(),
        LifecycleSignal::Stop => tracker.stop(),
    }
}

/// Run the lock monitor until SIGINT or SIGTERM.
pub fn run() -> Result<(), InitError> {
    let config = MonitorConfig::load().map_err(InitError::Config)?;
    let db = Arc::new(Mutex::new(open_database(&config)?));

    let platform = Arc::new(NativePlatform::new());
    let redirect: Arc<dyn HomeRedirect> = Arc::<NativePlatform>::clone(&platform);
    let surface: Arc<dyn NoticeSurface> = Arc::<NativePlatform>::clone(&platform);
    let source: Arc<dyn PlatformTracker> = platform;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let notices = NoticeManager::new(
        Arc::new(ThreadScheduler),
        Arc::clone(&clock),
        config.notice_duration(),
    );
    let monitor = Arc::new(LockMonitor::new(
        Arc::new(SqliteLockStore::new(db)),
        redirect,
        notices,
        Arc::clone(&clock),
    ));
    monitor.on_start(surface);

    let tracker = Arc::new(TrackerService::new(source, clock, config.tracker()));
    let (events, receiver) = mpsc::channel();
    let handle = tracker.start(events);

    let watcher = {
        let monitor = Arc::clone(&monitor);
        let tracker = Arc::clone(&tracker);
        signals::watch(move |signal| handle_signal(&monitor, &tracker, signal))
    };
    if let Err(e) = watcher {
        tracker.stop();
        monitor.run(&receiver);
        return Err(InitError::Signals(e));
    }

    monitor.run(&receiver);

    if handle.join().is_err() {
        error!("Tracker thread panicked");
    }
    Ok(())
}

/// Serve permission queries on stdin/stdout until the caller hangs up.
pub fn run_bridge() -> std::io::Result<()> {
    let probe: Arc<dyn PermissionProbe> = Arc::new(NativePlatform::new());
    let bridge = PermissionBridge::new(probe);
    bridge.run(&mut std::io::stdin().lock(), &mut std::io::stdout().lock())
}
