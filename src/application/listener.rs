//! Handle for long-lived background listeners.

use tokio::task::JoinHandle;

/// Owns a spawned listener task.
///
/// The task is aborted when the handle is released or dropped, so a torn
/// down component never keeps receiving notifications.
#[derive(Debug)]
pub struct ListenerHandle {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn new(name: &'static str, task: JoinHandle<()>) -> Self {
        Self {
            name,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True while the listener task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Stops the listener.
    pub fn release(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(listener = self.name, "Listener released");
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn drop_aborts_task() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _tx = tx;
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let handle = ListenerHandle::new("test", task);
        assert!(handle.is_active());
        drop(handle);

        // Sender is dropped once the aborted task is torn down.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn release_stops_listener() {
        let handle = ListenerHandle::new(
            "test",
            tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }),
        );
        assert_eq!(handle.name(), "test");
        handle.release();
    }
}
