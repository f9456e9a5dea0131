//! Pipeline completion notifications.
//!
//! A poll flow publishes one [`PipelineEvent`] per run. Observers subscribe
//! for a single flow name and either poll [`PipelineListener::is_notified`]
//! or await [`PipelineListener::wait`].

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::job::JobId;

const DEFAULT_CAPACITY: usize = 64;

/// Outcome of one poll flow pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The poll read its records and handed them to a batch job.
    Completed {
        flow: String,
        job_id: JobId,
        records: usize,
    },
    /// The poll could not read the source.
    Failed { flow: String, error: String },
}

impl PipelineEvent {
    pub fn flow(&self) -> &str {
        match self {
            PipelineEvent::Completed { flow, .. } | PipelineEvent::Failed { flow, .. } => flow,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            PipelineEvent::Completed { job_id, .. } => Some(job_id),
            PipelineEvent::Failed { .. } => None,
        }
    }
}

/// Broadcasts pipeline events to any number of listeners.
#[derive(Debug, Clone)]
pub struct PipelineNotifier {
    sender: broadcast::Sender<PipelineEvent>,
}

impl Default for PipelineNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PipelineNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns the number of listeners that received it.
    pub fn publish(&self, event: PipelineEvent) -> usize {
        debug!(flow = %event.flow(), ?event, "Publishing pipeline event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Listen for events of one flow. Only events published after this call
    /// are seen.
    pub fn subscribe(&self, flow: impl Into<String>) -> PipelineListener {
        PipelineListener {
            flow: flow.into(),
            receiver: self.sender.subscribe(),
            notified: None,
        }
    }
}

/// Receives the events of a single flow.
#[derive(Debug)]
pub struct PipelineListener {
    flow: String,
    receiver: broadcast::Receiver<PipelineEvent>,
    notified: Option<PipelineEvent>,
}

impl PipelineListener {
    pub fn flow(&self) -> &str {
        &self.flow
    }

    /// Completion event seen so far, if any.
    pub fn event(&self) -> Option<&PipelineEvent> {
        self.notified.as_ref()
    }

    /// Drain pending events without waiting. Latches once a `Completed` event
    /// for this flow has arrived.
    pub fn is_notified(&mut self) -> bool {
        while self.notified.is_none() {
            match self.receiver.try_recv() {
                Ok(event) => self.observe(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(flow = %self.flow, skipped, "Listener lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        self.notified.is_some()
    }

    /// Wait for this flow's next event, `Completed` or `Failed`.
    pub async fn wait(&mut self, timeout: Duration) -> Result<PipelineEvent> {
        if let Some(ref event) = self.notified {
            return Ok(event.clone());
        }

        let flow = self.flow.clone();
        let receiver = &mut self.receiver;
        let received = tokio::time::timeout(timeout, async {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.flow() == flow => return Ok(event),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(flow = %flow, skipped, "Listener lagged");
                    }
                    Err(RecvError::Closed) => {
                        return Err(Error::new(ErrorKind::ChannelClosed(flow.clone())))
                    }
                }
            }
        })
        .await
        .map_err(|_| {
            Error::new(ErrorKind::Timeout(format!(
                "no pipeline event for flow {flow} within {timeout:?}"
            )))
        })??;

        if matches!(received, PipelineEvent::Completed { .. }) {
            self.notified = Some(received.clone());
        }
        Ok(received)
    }

    fn observe(&mut self, event: PipelineEvent) {
        if event.flow() == self.flow && matches!(event, PipelineEvent::Completed { .. }) {
            self.notified = Some(event);
        }
    }
}
