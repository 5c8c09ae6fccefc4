//! Sequential multi-step operations with independent outcomes.
//!
//! The persistence collaborator exposes single-entity writes only, so bulk
//! effects (flushing a draft recipe, attaching several recipes to an event) are
//! composed as an ordered list of steps. Steps run strictly one after another;
//! a failed step is recorded and the remaining steps still run. The caller gets
//! a [`SagaReport`] instead of an all-or-nothing result.

use crate::errors::{Error, Result};
use std::future::Future;
use tracing::{debug, info, instrument, warn};

/// Outcome of one step.
#[derive(Debug)]
pub struct StepOutcome<K, T> {
    /// Position of the step in submission order
    pub index: usize,
    /// The input the step was run with
    pub key: K,
    /// What the step produced
    pub result: Result<T>,
}

impl<K, T> StepOutcome<K, T> {
    /// True when the step succeeded.
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-step report of a saga run, in submission order.
#[derive(Debug)]
pub struct SagaReport<K, T> {
    /// Name used in logs
    pub name: &'static str,
    /// One entry per step
    pub outcomes: Vec<StepOutcome<K, T>>,
}

impl<K, T> SagaReport<K, T> {
    /// A report with no steps.
    pub const fn empty(name: &'static str) -> Self {
        Self {
            name,
            outcomes: Vec::new(),
        }
    }

    /// Number of steps that succeeded.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of steps that failed.
    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// True when every step succeeded (vacuously true for no steps).
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(StepOutcome::is_success)
    }

    /// Successful step values with their keys.
    pub fn succeeded(&self) -> impl Iterator<Item = (&K, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|v| (&o.key, v)))
    }

    /// Failed steps with their keys and errors.
    pub fn failed(&self) -> impl Iterator<Item = (&K, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.key, e)))
    }
}

/// An ordered list of steps waiting to run.
#[derive(Debug)]
pub struct Saga<K> {
    name: &'static str,
    steps: Vec<K>,
}

impl<K: Clone> Saga<K> {
    /// Creates an empty saga.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Creates a saga from steps in order.
    pub fn with_steps(name: &'static str, steps: impl IntoIterator<Item = K>) -> Self {
        Self {
            name,
            steps: steps.into_iter().collect(),
        }
    }

    /// Appends a step.
    pub fn push(&mut self, step: K) {
        self.steps.push(step);
    }

    /// Number of queued steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order, awaiting each before starting the next.
    ///
    /// Failures never abort the run and nothing is retried.
    #[instrument(skip_all, fields(saga = self.name, steps = self.steps.len()))]
    pub async fn run<T, F, Fut>(self, mut op: F) -> SagaReport<K, T>
    where
        F: FnMut(K) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = self.steps.len();
        let mut report = SagaReport::empty(self.name);
        debug!("Saga '{}' starting with {} steps", self.name, total);

        for (index, key) in self.steps.into_iter().enumerate() {
            let result = op(key.clone()).await;
            if let Err(e) = &result {
                warn!(
                    "Saga '{}' step {}/{} failed: {}",
                    self.name,
                    index + 1,
                    total,
                    e
                );
            }
            report.outcomes.push(StepOutcome { index, key, result });
        }

        info!(
            "Saga '{}' finished: {} succeeded, {} failed",
            self.name,
            report.success_count(),
            report.failure_count()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_failures_do_not_abort_remaining_steps() {
        let seen = RefCell::new(Vec::new());
        let saga = Saga::with_steps("test", [1_i64, 2, 3, 4]);

        let report = saga
            .run(|n| {
                seen.borrow_mut().push(n);
                async move {
                    if n % 2 == 0 {
                        Err(Error::RecipeNotFound { id: n })
                    } else {
                        Ok(n * 10)
                    }
                }
            })
            .await;

        assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 2);
        assert!(!report.is_complete());
        assert_eq!(
            report.succeeded().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
            vec![(1, 10), (3, 30)]
        );
        assert_eq!(
            report.failed().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![2, 4]
        );
        assert_eq!(report.outcomes[3].index, 3);
    }

    #[tokio::test]
    async fn test_empty_saga_is_complete() {
        let saga: Saga<i64> = Saga::new("empty");
        assert!(saga.is_empty());
        let report = saga.run(|n| async move { Ok(n) }).await;
        assert!(report.is_complete());
        assert_eq!(report.outcomes.len(), 0);
    }
}
