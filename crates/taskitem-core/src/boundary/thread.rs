//! In-process isolation: a worker thread reached only through byte channels.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use super::{
    protocol::{serve_request, HostRequest, HostResponse},
    IsolationBoundary,
};
use crate::{config::Config, context::ItemContext, Error, Result};

/// Worker thread that builds items from encoded requests.
///
/// Requests and responses cross as JSON bytes, so the worker never holds a
/// reference into the caller's items.
#[derive(Debug)]
pub struct ThreadBoundary {
    requests: Option<Sender<Vec<u8>>>,
    responses: Receiver<Vec<u8>>,
    worker: Option<JoinHandle<()>>,
    timeout: Duration,
    /// Set once an exchange goes unanswered; a late reply would pair with
    /// the wrong request, so no further exchanges are attempted.
    failure: Option<String>,
}

impl ThreadBoundary {
    /// Start a worker resolving items against `context`.
    ///
    /// # Errors
    ///
    /// Returns a boundary error if the thread cannot be spawned.
    pub fn start(context: Arc<ItemContext>, timeout: Duration) -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<Vec<u8>>();
        let (response_tx, response_rx) = unbounded::<Vec<u8>>();

        let worker = thread::Builder::new()
            .name("taskitem-isolation".to_string())
            .spawn(move || {
                for bytes in request_rx {
                    let response = match serde_json::from_slice::<HostRequest>(&bytes) {
                        Ok(request) => serve_request(request, &context),
                        Err(e) => HostResponse::Failed {
                            message: e.to_string(),
                        },
                    };
                    let closing = response == HostResponse::Closed;

                    let encoded = match serde_json::to_vec(&response) {
                        Ok(encoded) => encoded,
                        Err(e) => {
                            warn!("Failed to encode isolation response: {e}");
                            break;
                        }
                    };
                    if response_tx.send(encoded).is_err() || closing {
                        break;
                    }
                }
            })
            .map_err(|e| Error::boundary(format!("failed to start isolation thread: {e}")))?;

        debug!("isolation thread started");
        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(worker),
            timeout,
            failure: None,
        })
    }

    /// Start a worker using the configured working directory and timeout.
    ///
    /// # Errors
    ///
    /// Returns a boundary error if the thread cannot be spawned.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::start(
            Arc::new(ItemContext::from_config(config)),
            Duration::from_millis(config.boundary.timeout_ms),
        )
    }
}

impl IsolationBoundary for ThreadBoundary {
    fn exchange(&mut self, request: &HostRequest) -> Result<HostResponse> {
        if let Some(failure) = &self.failure {
            return Err(Error::boundary(format!(
                "isolation thread unusable after earlier failure: {failure}"
            )));
        }
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| Error::boundary("isolation thread already torn down"))?;

        requests
            .send(serde_json::to_vec(request)?)
            .map_err(|_| Error::boundary("isolation thread is no longer running"))?;

        let reply = match self.responses.recv_timeout(self.timeout) {
            Ok(reply) => reply,
            Err(e) => {
                let failure = match e {
                    RecvTimeoutError::Timeout => format!(
                        "isolation thread did not answer within {}ms",
                        self.timeout.as_millis()
                    ),
                    RecvTimeoutError::Disconnected => {
                        "isolation thread exited before answering".to_string()
                    }
                };
                // Stop the worker once it drains what it already holds.
                drop(self.requests.take());
                self.failure = Some(failure.clone());
                return Err(Error::boundary(failure));
            }
        };

        Ok(serde_json::from_slice(&reply)?)
    }

    fn teardown(&mut self) -> Result<()> {
        // Closing the request channel ends the worker loop.
        drop(self.requests.take());

        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| Error::boundary("isolation thread panicked"))?;
            debug!("isolation thread stopped");
        }
        Ok(())
    }
}

impl Drop for ThreadBoundary {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!("Failed to stop isolation thread: {e}");
        }
    }
}
