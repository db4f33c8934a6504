//! Process signals mapped onto the monitor lifecycle.
//!
//! SIGINT and SIGTERM stop the monitor. SIGHUP clears any notice on screen
//! and keeps running.

use log::info;
use std::io;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    Interrupt,
    Stop,
}

#[cfg(unix)]
struct Listeners {
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Listeners {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn wait<F: Fn(LifecycleSignal)>(mut self, on_signal: F) {
        loop {
            tokio::select! {
                _ = self.terminate.recv() => {
                    info!("Received SIGTERM");
                    break;
                }
                _ = self.interrupt.recv() => {
                    info!("Received SIGINT");
                    break;
                }
                _ = self.hangup.recv() => {
                    info!("Received SIGHUP");
                    on_signal(LifecycleSignal::Interrupt);
                }
            }
        }
        on_signal(LifecycleSignal::Stop);
    }
}

#[cfg(not(unix))]
struct Listeners;

#[cfg(not(unix))]
impl Listeners {
    fn register() -> io::Result<Self> {
        Ok(Self)
    }

    async fn wait<F: Fn(LifecycleSignal)>(self, on_signal: F) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Ctrl-C handler failed: {e}");
            return;
        }
        info!("Received Ctrl-C");
        on_signal(LifecycleSignal::Stop);
    }
}

/// Register the signal handlers, then deliver signals to `on_signal` from a
/// background thread. The thread exits after the first stop signal.
pub fn watch<F>(on_signal: F) -> io::Result<JoinHandle<()>>
where
    F: Fn(LifecycleSignal) + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let listeners = {
        let _guard = runtime.enter();
        Listeners::register()?
    };

    thread::Builder::new()
        .name("zensta-signals".into())
        .spawn(move || runtime.block_on(listeners.wait(on_signal)))
}
