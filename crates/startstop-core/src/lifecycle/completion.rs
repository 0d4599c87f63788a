use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use startstop_types::{FailureSet, LifecycleError};
use tokio::sync::oneshot;

pub(crate) type Reply = oneshot::Sender<Result<(), FailureSet>>;

/// Resolves once the run a lifecycle call attached to has finished.
///
/// The run itself is driven by a spawned task, so dropping a `Completion`
/// only discards the outcome; it never cancels the run.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<(), FailureSet>>,
}

impl Completion {
    pub(crate) fn channel() -> (Reply, Completion) {
        let (tx, rx) = oneshot::channel();
        (tx, Completion { rx })
    }
}

impl Future for Completion {
    type Output = Result<(), LifecycleError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(())) => Ok(()),
            Ok(Err(failures)) => Err(LifecycleError::Failed(failures)),
            Err(_) => Err(LifecycleError::Interrupted),
        })
    }
}
