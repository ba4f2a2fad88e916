use std::{future::Future, pin::Pin, time::Duration};

pub type PauseFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Simulated work latency. Stages draw the delay and hand it to the provider.
pub trait Latency: Send + Sync {
    fn pause(&self, delay: Duration) -> PauseFuture<'_>;
}

/// Suspends the task on the tokio timer for the full delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepLatency;

impl Latency for SleepLatency {
    fn pause(&self, delay: Duration) -> PauseFuture<'_> {
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        })
    }
}

/// Completes immediately regardless of the drawn delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantLatency;

impl Latency for InstantLatency {
    fn pause(&self, _delay: Duration) -> PauseFuture<'_> {
        Box::pin(std::future::ready(()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every requested delay without waiting.
    #[derive(Debug, Default)]
    pub struct RecordingLatency {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingLatency {
        pub fn delays(&self) -> Vec<Duration> {
            self.delays.lock().expect("latency guard poisoned").clone()
        }
    }

    impl Latency for RecordingLatency {
        fn pause(&self, delay: Duration) -> PauseFuture<'_> {
            self.delays
                .lock()
                .expect("latency guard poisoned")
                .push(delay);
            Box::pin(std::future::ready(()))
        }
    }
}
