//! Spawned tasks that can be cancelled and awaited from any number of
//! handles.

use std::{future::Future, panic::AssertUnwindSafe};

use {
    futures::FutureExt,
    tokio::sync::watch,
    tokio_util::sync::CancellationToken,
    tracing::error,
};

/// Handle to a task started with [`spawn_supervised`].
///
/// Cloning is cheap; every clone observes the same task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    cancel: CancellationToken,
    finished: watch::Receiver<bool>,
}

impl TaskHandle {
    /// Request cancellation. Does not wait.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the task body and its exit hook have both run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        *self.finished.borrow() || self.finished.has_changed().is_err()
    }

    /// Wait for the task to finish without cancelling it.
    pub async fn join(&self) {
        let mut finished = self.finished.clone();
        // Err means the task was dropped without reporting, which also
        // means it is gone.
        let _ = finished.wait_for(|done| *done).await;
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(&self) {
        self.cancel();
        self.join().await;
    }
}

/// Spawn `body`, handing it `cancel`.
///
/// `on_exit` runs on every exit path, panics included. It is awaited to
/// completion before any [`TaskHandle::join`] caller is released.
pub fn spawn_supervised<F, Fut, E, ExitFut>(
    name: impl Into<String>,
    cancel: CancellationToken,
    body: F,
    on_exit: E,
) -> TaskHandle
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
    E: FnOnce() -> ExitFut + Send + 'static,
    ExitFut: Future<Output = ()> + Send,
{
    let name = name.into();
    let (done_tx, done_rx) = watch::channel(false);
    let fut = body(cancel.clone());

    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            error!(task = %name, panic = %message, "supervised task panicked");
        }
        on_exit().await;
        let _ = done_tx.send(true);
    });

    TaskHandle {
        cancel,
        finished: done_rx,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_the_exit_hook() {
        let exited = Arc::new(AtomicBool::new(false));
        let handle = spawn_supervised(
            "worker",
            CancellationToken::new(),
            |cancel| async move { cancel.cancelled().await },
            {
                let exited = Arc::clone(&exited);
                move || async move { exited.store(true, Ordering::SeqCst) }
            },
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.is_finished());

        handle.shutdown().await;
        assert!(exited.load(Ordering::SeqCst));
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn exit_hook_runs_after_a_panic() {
        let exited = Arc::new(AtomicBool::new(false));
        let handle = spawn_supervised(
            "doomed",
            CancellationToken::new(),
            |_| async { panic!("boom"); },
            {
                let exited = Arc::clone(&exited);
                move || async move { exited.store(true, Ordering::SeqCst) }
            },
        );

        handle.join().await;
        assert!(exited.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn join_waits_for_an_async_exit_hook() {
        let exited = Arc::new(AtomicBool::new(false));
        let handle = spawn_supervised("slow", CancellationToken::new(), |_| async {}, {
            let exited = Arc::clone(&exited);
            move || async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                exited.store(true, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!handle.is_finished());

        handle.join().await;
        assert!(exited.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn every_clone_sees_completion() {
        let handle = spawn_supervised("quick", CancellationToken::new(), |_| async {}, || async {});
        let other = handle.clone();
        handle.join().await;
        other.join().await;
        assert!(other.is_finished());
        // joining a finished task returns immediately
        other.shutdown().await;
    }
}
