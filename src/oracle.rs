//! The policy/value network seen as an opaque scoring oracle, and the
//! batching layer that feeds it from many search threads.
//!
//! Search threads submit feature tensors to a [`BatchQueue`] and block on a
//! one-shot reply channel. A collector thread drains the queue until a batch
//! is full or the batch wait elapses, calls the oracle once, and answers
//! every pending request.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::OracleError;

/// Network output for one position.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// `size * size + 1` move probabilities; the last entry is pass
    pub priors: Vec<f32>,
    /// Expected outcome in `[-1, 1]` for the player to move
    pub value: f32,
}

/// Anything that scores positions from their feature planes.
pub trait Oracle: Send + Sync {
    /// Evaluate a batch of inputs built by [`crate::features::extract`] for a
    /// board of the given size. Must return one evaluation per input.
    fn evaluate(&self, size: usize, batch: &[Vec<f32>]) -> Result<Vec<Evaluation>, OracleError>;
}

/// Uniform priors and an even value for every position.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformOracle;

impl Oracle for UniformOracle {
    fn evaluate(&self, size: usize, batch: &[Vec<f32>]) -> Result<Vec<Evaluation>, OracleError> {
        let n = size * size + 1;
        Ok(batch
            .iter()
            .map(|_| Evaluation {
                priors: vec![1.0 / n as f32; n],
                value: 0.0,
            })
            .collect())
    }
}

struct Request {
    features: Vec<f32>,
    reply: Sender<Result<Evaluation, OracleError>>,
}

/// Batching front end of an [`Oracle`].
pub struct BatchQueue {
    sender: Option<SyncSender<Request>>,
    collector: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl BatchQueue {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        size: usize,
        batch_size: usize,
        batch_wait: Duration,
        timeout: Duration,
    ) -> BatchQueue {
        let batch_size = batch_size.max(1);
        let (sender, receiver) = mpsc::sync_channel(batch_size * 4);
        let collector =
            thread::spawn(move || collect(receiver, oracle, size, batch_size, batch_wait));
        BatchQueue {
            sender: Some(sender),
            collector: Some(collector),
            timeout,
        }
    }

    /// Submit one input and wait for its evaluation, at most the configured
    /// timeout.
    pub fn evaluate(&self, features: Vec<f32>) -> Result<Evaluation, OracleError> {
        let Some(sender) = &self.sender else {
            return Err(OracleError::Disconnected);
        };
        let (reply, answer) = mpsc::channel();
        sender
            .send(Request { features, reply })
            .map_err(|_| OracleError::Disconnected)?;
        match answer.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(OracleError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(OracleError::Disconnected),
        }
    }
}

impl Drop for BatchQueue {
    fn drop(&mut self) {
        // Closing the channel ends the collector loop
        self.sender.take();
        if let Some(handle) = self.collector.take()
            && handle.join().is_err()
        {
            log::warn!("oracle collector thread panicked");
        }
    }
}

fn collect(
    receiver: Receiver<Request>,
    oracle: Arc<dyn Oracle>,
    size: usize,
    batch_size: usize,
    batch_wait: Duration,
) {
    let expected = size * size + 1;
    while let Ok(first) = receiver.recv() {
        let mut batch = vec![first];
        let deadline = Instant::now() + batch_wait;
        while batch.len() < batch_size {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match receiver.recv_timeout(deadline - now) {
                Ok(request) => batch.push(request),
                Err(_) => break,
            }
        }

        let (inputs, replies): (Vec<_>, Vec<_>) =
            batch.into_iter().map(|r| (r.features, r.reply)).unzip();
        log::trace!("oracle batch of {}", inputs.len());

        match oracle.evaluate(size, &inputs) {
            Ok(evaluations) if evaluations.len() == replies.len() => {
                for (reply, evaluation) in replies.into_iter().zip(evaluations) {
                    let result = if evaluation.priors.len() == expected {
                        Ok(evaluation)
                    } else {
                        Err(OracleError::BadOutput(format!(
                            "{} priors, expected {expected}",
                            evaluation.priors.len()
                        )))
                    };
                    // The requester may have timed out already
                    let _ = reply.send(result);
                }
            }
            Ok(evaluations) => {
                let error = OracleError::BadOutput(format!(
                    "{} evaluations for {} inputs",
                    evaluations.len(),
                    replies.len()
                ));
                for reply in replies {
                    let _ = reply.send(Err(error.clone()));
                }
            }
            Err(error) => {
                log::warn!("oracle failed: {error}");
                for reply in replies {
                    let _ = reply.send(Err(error.clone()));
                }
            }
        }
    }
}
