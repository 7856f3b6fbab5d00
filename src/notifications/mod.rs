//! Fire-and-forget outbound email.
//!
//! Requests push messages onto a bounded channel and move on. A single
//! dispatcher task drains the channel and hands each message to its own task,
//! which retries a failed send with exponential backoff before giving up.

pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::domain::errors::DomainError;
use crate::domain::ports::{EmailMessage, Mailer};

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// base × 2^retry, for retry = 0, 1, 2, ...
    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Handle used by the application layer to queue emails.
#[derive(Clone)]
pub struct EmailQueue {
    sender: mpsc::Sender<EmailMessage>,
}

impl EmailQueue {
    /// A queue plus the receiving end, for callers that drive delivery
    /// themselves.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EmailMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Spawns the dispatcher on the current tokio runtime.
    pub fn start(mailer: Arc<dyn Mailer>, policy: RetryPolicy, capacity: usize) -> Self {
        let (queue, receiver) = Self::channel(capacity);
        tokio::spawn(dispatch(receiver, mailer, policy));
        queue
    }

    /// Never blocks. A full or closed queue drops the message.
    pub fn enqueue(&self, message: EmailMessage) {
        let subject = message.subject.clone();
        if let Err(e) = self.sender.try_send(message) {
            log::error!(target: "email", "email dropped, queue unavailable subject={subject:?}: {e}");
        }
    }
}

pub async fn dispatch(
    mut receiver: mpsc::Receiver<EmailMessage>,
    mailer: Arc<dyn Mailer>,
    policy: RetryPolicy,
) {
    while let Some(message) = receiver.recv().await {
        let mailer = mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = deliver(mailer.as_ref(), &message, policy).await {
                log::error!(
                    target: "email",
                    "giving up on email to={} subject={:?}: {e}",
                    message.to,
                    message.subject
                );
            }
        });
    }
    log::info!(target: "email", "email queue closed");
}

/// Send with retries. Returns the last error once retries are exhausted.
pub async fn deliver(
    mailer: &dyn Mailer,
    message: &EmailMessage,
    policy: RetryPolicy,
) -> Result<(), DomainError> {
    let mut retry = 0;
    loop {
        match mailer.send(message).await {
            Ok(()) => {
                log::info!(target: "email", "email sent to={} subject={:?}", message.to, message.subject);
                return Ok(());
            }
            Err(e) if retry < policy.max_retries => {
                let delay = policy.delay(retry);
                log::warn!(
                    target: "email",
                    "email to={} failed (attempt {}), retrying in {:?}: {e}",
                    message.to,
                    retry + 1,
                    delay
                );
                sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Fails the first `failures` sends, then records every message.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub failures: u32,
        pub attempts: AtomicU32,
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    impl RecordingMailer {
        pub fn failing(failures: u32) -> Self {
            Self {
                failures,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(DomainError::Internal("smtp unavailable".to_string()));
            }
            self.sent.lock().expect("lock").push(message.clone());
            Ok(())
        }
    }

    /// Every message currently waiting in the queue.
    pub fn drain(receiver: &mut mpsc::Receiver<EmailMessage>) -> Vec<EmailMessage> {
        let mut out = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            out.push(message);
        }
        out
    }
}
