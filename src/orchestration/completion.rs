//! Single-resolution completion signal
//!
//! A publish has more than one event that may end it: the process failing,
//! its error stream failing, or the process exiting. Every such event calls
//! [`Completion::complete`]; only the first call delivers a value and every
//! later call is a no-op.

use crate::core::error::MigrateError;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Sending half; cheap to clone, first writer wins
pub struct Completion<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

/// Receiving half
pub struct CompletionReceiver<T> {
    receiver: oneshot::Receiver<T>,
}

/// Create a linked completion pair
pub fn completion<T>() -> (Completion<T>, CompletionReceiver<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        Completion {
            sender: Arc::new(Mutex::new(Some(sender))),
        },
        CompletionReceiver { receiver },
    )
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Completion<T> {
    /// Deliver `value` if nothing has been delivered yet
    ///
    /// Returns `true` for the call that took effect, `false` for every later one.
    pub fn complete(&self, value: T) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match sender {
            Some(sender) => {
                // The receiver may already be gone; the first call still wins.
                let _ = sender.send(value);
                true
            }
            None => false,
        }
    }
}

impl<T> CompletionReceiver<T> {
    /// Wait for the first delivered value
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::CompletionDropped` if every sender was dropped
    /// without completing.
    pub async fn wait(self) -> Result<T, MigrateError> {
        self.receiver
            .await
            .map_err(|_| MigrateError::CompletionDropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_value_wins() {
        let (completion, receiver) = completion::<Result<i32, String>>();

        assert!(completion.complete(Err("process error".to_string())));
        assert!(!completion.complete(Ok(0)));

        assert_eq!(receiver.wait().await.unwrap(), Err("process error".to_string()));
    }

    #[tokio::test]
    async fn test_second_call_from_clone_is_noop() {
        let (completion, receiver) = completion::<&'static str>();
        let exit_handle = completion.clone();

        assert!(exit_handle.complete("exit"));
        assert!(!completion.complete("error"));

        assert_eq!(receiver.wait().await.unwrap(), "exit");
    }

    #[tokio::test]
    async fn test_completes_across_tasks() {
        let (completion, receiver) = completion::<u8>();
        let drain = completion.clone();

        let handle = tokio::spawn(async move { drain.complete(1) });
        let first = handle.await.unwrap();
        let second = completion.complete(2);

        assert!(first);
        assert!(!second);
        assert_eq!(receiver.wait().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dropped_without_value() {
        let (completion, receiver) = completion::<u8>();
        drop(completion);

        assert!(matches!(
            receiver.wait().await,
            Err(MigrateError::CompletionDropped)
        ));
    }

    #[tokio::test]
    async fn test_complete_after_receiver_dropped_still_counts_once() {
        let (completion, receiver) = completion::<u8>();
        drop(receiver);

        assert!(completion.complete(1));
        assert!(!completion.complete(2));
    }
}
