//! Time-bounded execution of a single node attempt.

use std::any::Any;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// How a supervised attempt ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Supervised<R> {
    /// The attempt returned within its budget.
    Completed(R),
    /// The attempt panicked; carries the panic message.
    Panicked(String),
    /// The budget elapsed first. The attempt was signalled and detached.
    TimedOut,
}

/// Bounds how long a node attempt may run.
///
/// The attempt runs on its own task with a fresh [`CancellationToken`]. When
/// the budget elapses the token is cancelled and `TimedOut` is returned at
/// once; the task is left to notice the token on its own and is never
/// awaited again.
///
/// # Examples
///
/// ```
/// use nodeflow::{Supervised, TimeoutSupervisor};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let supervisor = TimeoutSupervisor::new(Duration::from_millis(20));
///
/// let fast = supervisor.run(|_cancel| async { 7 }).await;
/// assert_eq!(fast, Supervised::Completed(7));
///
/// let slow = supervisor
///     .run(|cancel| async move {
///         cancel.cancelled().await;
///         0
///     })
///     .await;
/// assert_eq!(slow, Supervised::TimedOut);
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSupervisor {
    budget: Duration,
}

impl TimeoutSupervisor {
    /// Creates a supervisor with the given budget.
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// Spawns `attempt` and waits for it or for the budget, whichever is first.
    pub async fn run<F, Fut, R>(&self, attempt: F) -> Supervised<R>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
    {
        let cancel = CancellationToken::new();
        let mut handle = tokio::spawn(attempt(cancel.clone()));

        match timeout(self.budget, &mut handle).await {
            Ok(Ok(result)) => Supervised::Completed(result),
            Ok(Err(join_error)) if join_error.is_panic() => {
                Supervised::Panicked(panic_message(join_error.into_panic()))
            }
            Ok(Err(join_error)) => Supervised::Panicked(join_error.to_string()),
            Err(_) => {
                cancel.cancel();
                // Dropping the handle detaches the task.
                drop(handle);
                Supervised::TimedOut
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
