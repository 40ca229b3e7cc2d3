//! Scripted geolocation provider for tests, demos, and the CLI simulator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use fairtrack_core::models::{
    Coordinates, ErrorKind, PositionError, PositionOptions, PositionReading,
};
use fairtrack_core::ports::{GeolocationProvider, PositionStream};
use futures::stream;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// What the simulated platform reports for one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SimulatedOutcome {
    Fix {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        accuracy_m: Option<f64>,
    },
    Error { kind: ErrorKind },
    /// Ends a watch. A one-shot request that draws this step never answers.
    Close,
}

/// One scripted answer, delivered `after` the request picks it up
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedStep {
    pub after: Duration,
    pub outcome: SimulatedOutcome,
}

impl SimulatedStep {
    pub fn new(after: Duration, outcome: SimulatedOutcome) -> Self {
        Self { after, outcome }
    }
}

#[derive(Debug, Default)]
struct Inner {
    steps: Mutex<VecDeque<SimulatedStep>>,
    available: Notify,
    requests: Mutex<Vec<PositionOptions>>,
}

/// In-memory provider that plays back a queue of steps.
///
/// Requests and watches draw from one shared queue in order. When the queue is
/// empty a request waits until a step is pushed, so an empty provider behaves
/// like a device that never gets a fix.
#[derive(Debug, Clone, Default)]
pub struct SimulatedProvider {
    inner: Arc<Inner>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: impl IntoIterator<Item = SimulatedStep>) -> Self {
        let provider = Self::new();
        for step in steps {
            provider.push(step);
        }
        provider
    }

    pub fn push(&self, step: SimulatedStep) {
        self.inner.steps.lock().unwrap_or_else(PoisonError::into_inner).push_back(step);
        self.inner.available.notify_one();
    }

    /// Queue an immediate fix
    pub fn push_fix(&self, latitude: f64, longitude: f64) {
        self.push(SimulatedStep::new(
            Duration::ZERO,
            SimulatedOutcome::Fix { latitude, longitude, accuracy_m: None },
        ));
    }

    /// Queue an immediate error
    pub fn push_error(&self, kind: ErrorKind) {
        self.push(SimulatedStep::new(Duration::ZERO, SimulatedOutcome::Error { kind }));
    }

    /// Options of every request and watch started so far, oldest first
    pub fn requests(&self) -> Vec<PositionOptions> {
        self.inner.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn record(&self, options: PositionOptions) {
        self.inner.requests.lock().unwrap_or_else(PoisonError::into_inner).push(options);
    }
}

impl Inner {
    fn pop(&self) -> Option<SimulatedStep> {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    async fn next_step(&self) -> SimulatedStep {
        loop {
            if let Some(step) = self.pop() {
                if !step.after.is_zero() {
                    tokio::time::sleep(step.after).await;
                }
                return step;
            }
            self.available.notified().await;
        }
    }
}

fn into_result(outcome: SimulatedOutcome) -> Option<Result<PositionReading, PositionError>> {
    match outcome {
        SimulatedOutcome::Fix { latitude, longitude, accuracy_m } => {
            let reading = PositionReading::new(Coordinates::new(latitude, longitude));
            Some(Ok(match accuracy_m {
                Some(accuracy) => reading.with_accuracy(accuracy),
                None => reading,
            }))
        }
        SimulatedOutcome::Error { kind } => {
            Some(Err(PositionError::new(kind, format!("Simulated {}", kind))))
        }
        SimulatedOutcome::Close => None,
    }
}

#[async_trait]
impl GeolocationProvider for SimulatedProvider {
    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<PositionReading, PositionError> {
        self.record(options);
        let step = self.inner.next_step().await;
        match into_result(step.outcome) {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    fn watch_position(&self, options: PositionOptions) -> PositionStream {
        self.record(options);
        // A watch that reports an error is finished; the tracker resubscribes.
        let inner = Arc::clone(&self.inner);
        Box::pin(stream::unfold(Some(inner), |state| async move {
            let inner = state?;
            let step = inner.next_step().await;
            into_result(step.outcome).map(|result| {
                let next = result.is_ok().then_some(inner);
                (result, next)
            })
        }))
    }
}
