//! Deadline service backing request timeouts: one thread per manager that
//! fires a oneshot when each deadline passes.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use futures::channel::oneshot;

use crate::domain::errors::OffloadError;

type Deadline = (Instant, oneshot::Sender<()>);

#[derive(Debug)]
pub struct TimerService {
    sender: mpsc::Sender<Deadline>,
}

impl TimerService {
    pub fn spawn() -> Result<Self, OffloadError> {
        let (sender, receiver) = mpsc::channel::<Deadline>();
        std::thread::Builder::new()
            .name("chart-offload-timer".into())
            .spawn(move || timer_loop(receiver))
            .map_err(|e| OffloadError::Unavailable(e.to_string()))?;
        Ok(Self { sender })
    }

    /// Resolves once `delay` has elapsed. Errors with `Canceled` if the
    /// timer thread is gone.
    pub fn after(&self, delay: Duration) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.sender.send((Instant::now() + delay, tx));
        rx
    }
}

fn timer_loop(receiver: mpsc::Receiver<Deadline>) {
    let mut pending: Vec<Deadline> = Vec::new();
    loop {
        let now = Instant::now();
        let mut index = 0;
        while index < pending.len() {
            if pending[index].0 <= now {
                let (_, tx) = pending.swap_remove(index);
                let _ = tx.send(());
            } else if pending[index].1.is_canceled() {
                pending.swap_remove(index);
            } else {
                index += 1;
            }
        }

        let next = pending.iter().map(|(deadline, _)| *deadline).min();
        let message = match next {
            Some(deadline) => receiver.recv_timeout(deadline.saturating_duration_since(now)),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match message {
            Ok(deadline) => pending.push(deadline),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
