use std::sync::Arc;

use auditlens_core::AppResult;
use auditlens_domain::{
    AuditRecord, FilterCriteria, PageCompletion, PageFetch, PageOutcome, PagePhase, PageState,
    PageTrigger, ResourceProfile, build_query, normalize_records,
};
use chrono::Utc;
use tracing::{debug, warn};

use crate::fetch_controller::{FetchError, PageRequest, PagedFetchController};

/// A fetch authorized by the session, paired with its wire request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPage {
    /// State machine ticket.
    pub fetch: PageFetch,
    /// Resource path the request is issued against.
    pub resource: String,
    /// Request issued for the ticket.
    pub request: PageRequest,
}

/// Observable state of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    /// Held records in arrival order.
    pub records: Vec<AuditRecord>,
    /// Current phase.
    pub phase: PagePhase,
    /// Whether a request is in flight.
    pub is_loading: bool,
    /// Whether further pages may exist.
    pub has_more: bool,
    /// Offset of the next page.
    pub offset: usize,
    /// Message of the last unrecovered fetch failure.
    pub last_error: Option<String>,
    /// Active criteria.
    pub criteria: FilterCriteria,
}

/// Per-view criteria and pagination state.
///
/// The session never performs I/O on its own; callers run the returned
/// [`PendingPage`] and hand the result back through [`Self::complete`].
pub struct AuditViewSession {
    controller: Arc<PagedFetchController>,
    profile: ResourceProfile,
    criteria: FilterCriteria,
    state: PageState,
    last_error: Option<String>,
}

impl AuditViewSession {
    /// Creates a session with empty criteria.
    pub fn new(
        controller: Arc<PagedFetchController>,
        profile: ResourceProfile,
        page_size: usize,
    ) -> AppResult<Self> {
        Ok(Self {
            controller,
            profile,
            criteria: FilterCriteria::default(),
            state: PageState::new(page_size)?,
            last_error: None,
        })
    }

    /// Returns the shared fetch controller.
    #[must_use]
    pub fn controller(&self) -> &Arc<PagedFetchController> {
        &self.controller
    }

    /// Returns the resource profile.
    #[must_use]
    pub fn profile(&self) -> &ResourceProfile {
        &self.profile
    }

    /// Returns the active criteria.
    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Returns the pagination state.
    #[must_use]
    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Applies a trigger with the current criteria.
    pub fn trigger(&mut self, trigger: PageTrigger) -> Option<PendingPage> {
        if trigger != PageTrigger::Scroll {
            self.last_error = None;
        }

        let fetch = self.state.begin(trigger)?;
        Some(self.pending(fetch))
    }

    /// Replaces the criteria and restarts from the first page.
    pub fn apply_filter(&mut self, criteria: FilterCriteria) -> Option<PendingPage> {
        self.criteria = criteria;
        self.trigger(PageTrigger::ApplyFilter)
    }

    /// Clears the criteria and restarts from the first page.
    pub fn clear_filter(&mut self) -> Option<PendingPage> {
        self.criteria = FilterCriteria::default();
        self.trigger(PageTrigger::ClearFilter)
    }

    /// Applies the result of `pending` and returns a follow-up fetch, if one
    /// was deferred behind it.
    pub fn complete(
        &mut self,
        pending: &PendingPage,
        result: Result<Vec<AuditRecord>, FetchError>,
    ) -> Option<PendingPage> {
        let (outcome, failure) = match result {
            Ok(records) => (PageOutcome::Loaded(records), None),
            Err(error) => (PageOutcome::Failed, Some(error)),
        };

        match self.state.complete(&pending.fetch, outcome) {
            PageCompletion::Applied => {
                if let Some(error) = failure {
                    warn!(
                        resource = %pending.resource,
                        offset = pending.request.offset(),
                        error = %error,
                        "audit page failed"
                    );
                    self.last_error = Some(error.to_string());
                }
                None
            }
            PageCompletion::Stale { restart } => {
                debug!(
                    resource = %pending.resource,
                    offset = pending.request.offset(),
                    "discarded page of superseded criteria"
                );
                restart.map(|fetch| self.pending(fetch))
            }
        }
    }

    /// Runs a trigger to completion, including any deferred follow-up.
    pub async fn load(&mut self, trigger: PageTrigger) {
        let pending = self.trigger(trigger);
        self.drive(pending).await;
    }

    /// Runs `pending` and every follow-up it produces.
    pub async fn drive(&mut self, mut pending: Option<PendingPage>) {
        while let Some(page) = pending {
            let result = fetch_records(&self.controller, &page.resource, &page.request).await;
            pending = self.complete(&page, result);
        }
    }

    /// Captures the observable state.
    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            records: self.state.accumulated().to_vec(),
            phase: self.state.phase(),
            is_loading: self.state.is_loading(),
            has_more: self.state.has_more(),
            offset: self.state.offset(),
            last_error: self.last_error.clone(),
            criteria: self.criteria.clone(),
        }
    }

    fn pending(&self, fetch: PageFetch) -> PendingPage {
        PendingPage {
            fetch,
            resource: self.profile.resource_path(&self.criteria),
            request: PageRequest::new(
                fetch.offset,
                fetch.limit,
                build_query(&self.criteria, &self.profile),
            ),
        }
    }
}

/// Fetches and normalizes one page.
pub async fn fetch_records(
    controller: &PagedFetchController,
    resource: &str,
    request: &PageRequest,
) -> Result<Vec<AuditRecord>, FetchError> {
    let page = controller.fetch_page(resource, request).await?;
    Ok(normalize_records(page.items(), Utc::now()))
}
