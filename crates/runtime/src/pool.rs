//! A small fixed-size worker pool backing `asyncActivate` (§5): the only
//! place a shard's `activate` may park on a genuinely blocking operation
//! without stalling its mesh's cooperative scheduler.
//!
//! Simplification note (see DESIGN.md): the source models `asyncActivate` as
//! a callback that directly resumes the parked coroutine from the worker
//! thread once the task completes. Driving an arbitrary foreign-thread wakeup
//! into a `may` coroutine without compiler feedback on the synchronization
//! is risky to get right blind, so this pool instead exposes a
//! polling-friendly handle: the caller's shard still suspends repeatedly
//! (`ctx.suspend(0.0)`) and checks `TaskHandle::poll()` between naps, rather
//! than being woken directly by the worker thread. The externally observable
//! contract — one suspension point per `asyncActivate`, work runs off the
//! mesh's driver thread — is preserved.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub type Task = Box<dyn FnOnce() -> loom_core::Value + Send + 'static>;

/// A handle to a task submitted to the pool. `poll` never blocks.
pub struct TaskHandle {
    result: Arc<Mutex<Option<loom_core::Value>>>,
}

impl TaskHandle {
    pub fn poll(&self) -> Option<loom_core::Value> {
        self.result.lock().expect("task result mutex poisoned").take()
    }
}

struct Worker {
    _handle: JoinHandle<()>,
}

/// Drains a shared task queue across `size` OS threads. Sized from
/// [`crate::config::RuntimeConfig::worker_pool_size`] (§5 ambient note).
pub struct WorkerPool {
    sender: mpsc::Sender<Task>,
    _workers: Vec<Worker>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..size)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                let handle = std::thread::Builder::new()
                    .name(format!("loom-worker-{id}"))
                    .spawn(move || loop {
                        let task = { receiver.lock().expect("worker queue mutex poisoned").recv() };
                        match task {
                            Ok(task) => task(),
                            Err(_) => break,
                        }
                    })
                    .expect("failed to spawn worker thread");
                Worker { _handle: handle }
            })
            .collect();
        WorkerPool { sender, _workers: workers }
    }

    /// Submits a task and returns a handle the caller polls for completion.
    /// Per §5, from the core's perspective this is a single suspension
    /// point around the caller's `asyncActivate`.
    pub fn submit<F>(&self, task: F) -> TaskHandle
    where
        F: FnOnce() -> loom_core::Value + Send + 'static,
    {
        let result = Arc::new(Mutex::new(None));
        let result_for_worker = Arc::clone(&result);
        let boxed: Task = Box::new(move || {
            let value = task();
            *result_for_worker.lock().expect("task result mutex poisoned") = Some(value.clone());
            value
        });
        self.sender.send(boxed).expect("worker pool queue disconnected");
        TaskHandle { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::Value;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn submitted_task_completes_and_is_observable_via_poll() {
        let pool = WorkerPool::new(2);
        let handle = pool.submit(|| Value::Int(42));

        let mut observed = None;
        for _ in 0..100 {
            if let Some(value) = handle.poll() {
                observed = Some(value);
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(observed, Some(Value::Int(42)));
    }
}
