use std::io;
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};
use log::{info, warn};

/// One-shot stop request observed by the capture loop.
pub struct Shutdown {
    rx: Receiver<()>,
}

/// Sending half, handed to whoever decides when capture stops.
#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: Sender<()>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // A full channel means a stop is already pending.
        let _ = self.tx.try_send(());
    }
}

impl Shutdown {
    pub fn manual() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = bounded(1);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    /// Watches for Ctrl+C on a dedicated thread.
    ///
    /// The handler is registered before this returns, so an interrupt right
    /// after the start banner is not lost. The first interrupt requests the
    /// stop; the handler stays registered afterwards, so further interrupts
    /// during the flush are logged and ignored instead of killing the process.
    pub fn install() -> io::Result<Shutdown> {
        let (trigger, shutdown) = Shutdown::manual();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut interrupts = {
            let _guard = runtime.enter();
            interrupt_stream()?
        };

        thread::Builder::new()
            .name("ctrl-c".into())
            .spawn(move || {
                runtime.block_on(async move {
                    if interrupts.recv().await.is_none() {
                        warn!("interrupt stream closed before any Ctrl+C");
                        return;
                    }
                    info!("interrupt received, stopping capture");
                    trigger.trigger();

                    while interrupts.recv().await.is_some() {
                        warn!("interrupt ignored: history is being written");
                    }
                });
            })?;

        Ok(shutdown)
    }

    /// True once a stop has been requested. Consumes the request.
    pub fn requested(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }
}

#[cfg(unix)]
fn interrupt_stream() -> io::Result<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{signal, SignalKind};
    signal(SignalKind::interrupt())
}

#[cfg(windows)]
fn interrupt_stream() -> io::Result<tokio::signal::windows::CtrlC> {
    tokio::signal::windows::ctrl_c()
}
