use std::time::Duration;

use auditlens_core::{AppError, AppResult};
use auditlens_domain::{AuditRecord, FilterCriteria, PageTrigger};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::fetch_controller::FetchError;
use crate::view_config::{DEFAULT_SCROLL_INTERVAL, DEFAULT_SCROLL_THRESHOLD_PX, ViewConfig};

use super::scroll::{ScrollCoalescer, ScrollSignal};
use super::session::{AuditViewSession, PendingPage, ViewSnapshot, fetch_records};

const EVENT_BUFFER: usize = 64;

/// Scroll rate limiting for a running view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    /// Distance from the bottom at which more records are loaded.
    pub threshold_px: u32,
    /// Coalescing window.
    pub interval: Duration,
}

impl ScrollSettings {
    /// Creates settings from view configuration.
    #[must_use]
    pub fn from_config(config: &ViewConfig) -> Self {
        Self {
            threshold_px: config.scroll_threshold_px,
            interval: config.scroll_interval,
        }
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            threshold_px: DEFAULT_SCROLL_THRESHOLD_PX,
            interval: DEFAULT_SCROLL_INTERVAL,
        }
    }
}

/// Input accepted by a running view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// View opened.
    Mount,
    /// New criteria submitted.
    ApplyFilter(FilterCriteria),
    /// Criteria cleared.
    ClearFilter,
    /// Scroll position changed.
    Scroll(ScrollSignal),
}

/// Owner-side handle of a view task.
///
/// Dropping the handle aborts the task together with any in-flight fetch.
pub struct ViewHandle {
    events: Option<mpsc::Sender<ViewEvent>>,
    snapshots: watch::Receiver<ViewSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl ViewHandle {
    /// Spawns the view task on the current runtime.
    #[must_use]
    pub fn spawn(session: AuditViewSession, settings: ScrollSettings) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        let runtime = ViewRuntime {
            session,
            coalescer: ScrollCoalescer::new(settings.interval),
            threshold_px: settings.threshold_px,
            fetches: JoinSet::new(),
            in_flight: None,
            snapshots: snapshot_tx,
        };

        Self {
            events: Some(events_tx),
            snapshots: snapshot_rx,
            task: Some(tokio::spawn(runtime.run(events_rx))),
        }
    }

    /// Queues an event for the view.
    pub async fn send(&self, event: ViewEvent) -> AppResult<()> {
        let sender = self
            .events
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("audit view is stopped".to_owned()))?;

        sender
            .send(event)
            .await
            .map_err(|error| AppError::Unavailable(format!("audit view is stopped: {error}")))
    }

    /// Returns a receiver of state snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshots.clone()
    }

    /// Returns the latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Closes the event channel and waits for the task to finish.
    pub async fn stop(mut self) -> AppResult<()> {
        self.events.take();

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|error| AppError::Internal(format!("audit view task failed: {error}")))?;
        }

        Ok(())
    }
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

type FetchResult = Result<Vec<AuditRecord>, FetchError>;

struct ViewRuntime {
    session: AuditViewSession,
    coalescer: ScrollCoalescer,
    threshold_px: u32,
    fetches: JoinSet<FetchResult>,
    in_flight: Option<PendingPage>,
    snapshots: watch::Sender<ViewSnapshot>,
}

impl ViewRuntime {
    async fn run(mut self, mut events: mpsc::Receiver<ViewEvent>) {
        info!(
            resource = self.session.profile().resource(),
            "audit view started"
        );

        loop {
            let deadline = self.coalescer.deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(joined) = self.fetches.join_next(), if !self.fetches.is_empty() => {
                    self.handle_joined(joined);
                }
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() => {
                    self.evaluate_scroll();
                }
            }

            self.publish();
        }

        self.fetches.abort_all();
        info!(
            resource = self.session.profile().resource(),
            "audit view stopped"
        );
    }

    fn handle_event(&mut self, event: ViewEvent) {
        let pending = match event {
            ViewEvent::Mount => self.session.trigger(PageTrigger::Mount),
            ViewEvent::ApplyFilter(criteria) => self.session.apply_filter(criteria),
            ViewEvent::ClearFilter => self.session.clear_filter(),
            ViewEvent::Scroll(signal) => {
                self.coalescer.offer(signal, Instant::now());
                None
            }
        };

        self.dispatch(pending);
    }

    fn evaluate_scroll(&mut self) {
        let Some(signal) = self.coalescer.take_due(Instant::now()) else {
            return;
        };

        if !signal.is_near_bottom(self.threshold_px) {
            return;
        }

        let pending = self.session.trigger(PageTrigger::Scroll);
        if pending.is_none() {
            debug!(
                phase = self.session.state().phase().as_str(),
                "scroll ignored"
            );
        }
        self.dispatch(pending);
    }

    fn handle_joined(&mut self, joined: Result<FetchResult, JoinError>) {
        let Some(pending) = self.in_flight.take() else {
            return;
        };

        let result = joined.unwrap_or_else(|error| Err(FetchError::Interrupted(error.to_string())));
        let next = self.session.complete(&pending, result);
        self.dispatch(next);
    }

    fn dispatch(&mut self, pending: Option<PendingPage>) {
        let Some(pending) = pending else {
            return;
        };

        let controller = self.session.controller().clone();
        let resource = pending.resource.clone();
        let request = pending.request.clone();
        self.fetches
            .spawn(async move { fetch_records(&controller, &resource, &request).await });
        self.in_flight = Some(pending);
    }

    fn publish(&self) {
        let next = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}
