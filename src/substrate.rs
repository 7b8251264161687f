//! Execution substrates for map tasks.
//!
//! The iteration controller only needs to hand over a unit of work and later
//! wait for its outcome. Where that work runs (inline or on a thread pool) is
//! decided by the [`ExecutionSubstrate`] implementation.

use crate::config::ExecutionMode;
use crate::error::{KMeansError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// How long `await_all` blocks on one handle before sweeping the others
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Awaitable outcome of a submitted task
pub struct TaskHandle<T> {
    state: HandleState<T>,
}

enum HandleState<T> {
    Ready(Result<T>),
    Pending(Receiver<Result<T>>),
}

impl<T> TaskHandle<T> {
    /// A handle whose task has already finished
    pub fn ready(outcome: Result<T>) -> Self {
        Self {
            state: HandleState::Ready(outcome),
        }
    }

    /// A handle that will receive its outcome on `receiver`
    pub fn pending(receiver: Receiver<Result<T>>) -> Self {
        Self {
            state: HandleState::Pending(receiver),
        }
    }

    /// Block until the task finishes
    pub fn wait(self) -> Result<T> {
        match self.state {
            HandleState::Ready(outcome) => outcome,
            HandleState::Pending(receiver) => receiver.recv().unwrap_or_else(|_| Err(dropped_task())),
        }
    }
}

fn dropped_task() -> KMeansError {
    KMeansError::Substrate("task was dropped before reporting a result".to_string())
}

/// Collect every outcome in submission order, returning as soon as any task
/// reports a failure, whichever position it was submitted at.
///
/// On failure the remaining handles are dropped. Tasks already running on a
/// pool finish there and their results are discarded; nothing is cancelled.
pub fn await_first_failure<T>(handles: Vec<TaskHandle<T>>) -> Result<Vec<T>> {
    let mut outcomes: Vec<Option<T>> = Vec::with_capacity(handles.len());
    let mut pending: Vec<(usize, Receiver<Result<T>>)> = Vec::new();

    for (idx, handle) in handles.into_iter().enumerate() {
        match handle.state {
            HandleState::Ready(outcome) => outcomes.push(Some(outcome?)),
            HandleState::Pending(receiver) => {
                outcomes.push(None);
                pending.push((idx, receiver));
            }
        }
    }

    while !pending.is_empty() {
        match pending[0].1.recv_timeout(POLL_INTERVAL) {
            Ok(outcome) => {
                let (idx, _) = pending.remove(0);
                outcomes[idx] = Some(outcome?);
            }
            Err(RecvTimeoutError::Disconnected) => return Err(dropped_task()),
            Err(RecvTimeoutError::Timeout) => {}
        }

        let mut i = 0;
        while i < pending.len() {
            match pending[i].1.try_recv() {
                Ok(outcome) => {
                    let (idx, _) = pending.swap_remove(i);
                    outcomes[idx] = Some(outcome?);
                }
                Err(TryRecvError::Disconnected) => return Err(dropped_task()),
                Err(TryRecvError::Empty) => i += 1,
            }
        }
    }

    outcomes
        .into_iter()
        .map(|outcome| outcome.ok_or_else(dropped_task))
        .collect()
}

/// Something that can run tasks and hand back awaitable handles
pub trait ExecutionSubstrate: Send + Sync {
    /// Schedule `task` and return a handle to its outcome
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static;

    /// Wait for every handle and return the outcomes in submission order.
    /// The first failure to arrive is returned without waiting for slower
    /// tasks; see [`await_first_failure`].
    fn await_all<T>(&self, handles: Vec<TaskHandle<T>>) -> Result<Vec<T>> {
        await_first_failure(handles)
    }

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// Run `task`, turning a panic into a substrate error
fn run_guarded<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
        Err(KMeansError::Substrate(format!(
            "task panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs every task inline, on the submitting thread
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialSubstrate;

impl ExecutionSubstrate for SequentialSubstrate {
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        TaskHandle::ready(run_guarded(task))
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Runs tasks on a dedicated rayon thread pool
pub struct RayonSubstrate {
    pool: ThreadPool,
}

impl RayonSubstrate {
    /// Build a pool with `threads` workers; 0 lets rayon pick.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("kmeans-map-{}", i))
            .build()
            .map_err(|e| KMeansError::Substrate(format!("cannot build thread pool: {}", e)))?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ExecutionSubstrate for RayonSubstrate {
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        self.pool.spawn(move || {
            // the receiver is gone if the iteration already failed
            let _ = sender.send(run_guarded(task));
        });
        TaskHandle::pending(receiver)
    }

    fn name(&self) -> &'static str {
        "rayon"
    }
}

/// Substrate chosen at runtime from an [`ExecutionMode`]
pub enum Substrate {
    Sequential(SequentialSubstrate),
    Rayon(RayonSubstrate),
}

impl Substrate {
    pub fn from_mode(mode: ExecutionMode) -> Result<Self> {
        match mode {
            ExecutionMode::Sequential => Ok(Substrate::Sequential(SequentialSubstrate)),
            ExecutionMode::ThreadPool { threads } => Ok(Substrate::Rayon(RayonSubstrate::new(threads)?)),
        }
    }
}

impl ExecutionSubstrate for Substrate {
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        match self {
            Substrate::Sequential(inner) => inner.submit(task),
            Substrate::Rayon(inner) => inner.submit(task),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Substrate::Sequential(inner) => inner.name(),
            Substrate::Rayon(inner) => inner.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_squares<S: ExecutionSubstrate>(substrate: &S) -> Result<Vec<u64>> {
        let handles = (0..16u64)
            .map(|i| substrate.submit(move || Ok(i * i)))
            .collect();
        substrate.await_all(handles)
    }

    #[test]
    fn test_sequential_preserves_order() {
        let results = collect_squares(&SequentialSubstrate).unwrap();
        assert_eq!(results, (0..16u64).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn test_rayon_preserves_order() {
        let substrate = RayonSubstrate::new(4).unwrap();
        assert_eq!(substrate.num_threads(), 4);

        let results = collect_squares(&substrate).unwrap();
        assert_eq!(results, (0..16u64).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn test_task_error_propagates() {
        let substrate = RayonSubstrate::new(2).unwrap();
        let handles: Vec<TaskHandle<u32>> = (0..4)
            .map(|i| {
                substrate.submit(move || {
                    if i == 2 {
                        Err(KMeansError::WorkerCompute("bad fragment".to_string()))
                    } else {
                        Ok(i)
                    }
                })
            })
            .collect();

        let result = substrate.await_all(handles);
        assert!(matches!(result, Err(KMeansError::WorkerCompute(_))));
    }

    #[test]
    fn test_panic_becomes_substrate_error() {
        for substrate in [
            Substrate::from_mode(ExecutionMode::Sequential).unwrap(),
            Substrate::from_mode(ExecutionMode::ThreadPool { threads: 2 }).unwrap(),
        ] {
            let handle: TaskHandle<()> = substrate.submit(|| panic!("worker died"));
            match handle.wait() {
                Err(KMeansError::Substrate(msg)) => assert!(msg.contains("worker died")),
                other => panic!("expected substrate error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_failure_returned_before_slow_tasks_finish() {
        let substrate = RayonSubstrate::new(2).unwrap();
        let start = std::time::Instant::now();

        let slow: TaskHandle<u32> = substrate.submit(|| {
            std::thread::sleep(Duration::from_secs(3));
            Ok(0)
        });
        let failing: TaskHandle<u32> =
            substrate.submit(|| Err(KMeansError::WorkerCompute("bad fragment".to_string())));

        let result = substrate.await_all(vec![slow, failing]);

        assert!(matches!(result, Err(KMeansError::WorkerCompute(_))));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_mixed_ready_and_pending_keep_order() {
        let pool = RayonSubstrate::new(2).unwrap();
        let handles = vec![
            TaskHandle::ready(Ok(1u32)),
            pool.submit(|| {
                std::thread::sleep(Duration::from_millis(20));
                Ok(2)
            }),
            pool.submit(|| Ok(3)),
            TaskHandle::ready(Ok(4)),
        ];

        assert_eq!(await_first_failure(handles).unwrap(), vec![1, 2, 3, 4]);
    }
}
