use auditlens_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::accumulator::{MergeMode, merge_page};
use crate::record::AuditRecord;

/// Lifecycle phase of a paged result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePhase {
    /// Ready to request the page at the current offset.
    Idle,
    /// One request is in flight.
    Loading,
    /// The last page was short; nothing more to fetch.
    Exhausted,
    /// Both endpoints failed; only a reset trigger leaves this phase.
    Failed,
}

impl PagePhase {
    /// Returns stable display value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }
}

/// Event that may start a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTrigger {
    /// View opened.
    Mount,
    /// New criteria submitted.
    ApplyFilter,
    /// Criteria cleared.
    ClearFilter,
    /// Scroll position crossed the proximity threshold.
    Scroll,
}

impl PageTrigger {
    fn resets(self) -> bool {
        !matches!(self, Self::Scroll)
    }
}

/// A page request authorized by [`PageState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFetch {
    /// Reset counter at the time the fetch started.
    pub generation: u64,
    /// Records to skip.
    pub offset: usize,
    /// Requested page size.
    pub limit: usize,
    /// How the result joins the held list.
    pub mode: MergeMode,
}

/// Result of an authorized fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Normalized records of the page.
    Loaded(Vec<AuditRecord>),
    /// Neither endpoint answered.
    Failed,
}

/// What [`PageState::complete`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCompletion {
    /// The result belonged to the current criteria and was applied.
    Applied,
    /// The criteria changed while the request was in flight; the result was dropped.
    Stale {
        /// First page of the current criteria, to be issued now.
        restart: Option<PageFetch>,
    },
}

/// Pagination state owned by one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    offset: usize,
    page_size: usize,
    has_more: bool,
    phase: PagePhase,
    accumulated: Vec<AuditRecord>,
    generation: u64,
    restart_pending: bool,
}

impl PageState {
    /// Creates an idle state at offset zero.
    pub fn new(page_size: usize) -> AppResult<Self> {
        if page_size == 0 {
            return Err(AppError::Validation(
                "page size must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            offset: 0,
            page_size,
            has_more: true,
            phase: PagePhase::Idle,
            accumulated: Vec::new(),
            generation: 0,
            restart_pending: false,
        })
    }

    /// Returns the offset of the next page.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the configured page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns whether further pages may exist.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> PagePhase {
        self.phase
    }

    /// Returns whether a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == PagePhase::Loading
    }

    /// Returns the held list.
    #[must_use]
    pub fn accumulated(&self) -> &[AuditRecord] {
        &self.accumulated
    }

    /// Returns the reset counter.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Applies a trigger and returns the fetch to issue, if any.
    ///
    /// Reset triggers always clear the held list. While a request is in
    /// flight the follow-up fetch is deferred until that request completes.
    pub fn begin(&mut self, trigger: PageTrigger) -> Option<PageFetch> {
        if trigger.resets() {
            self.reset();
            if self.is_loading() {
                self.restart_pending = true;
                return None;
            }
            return Some(self.start());
        }

        match self.phase {
            PagePhase::Idle if self.has_more => Some(self.start()),
            _ => None,
        }
    }

    /// Applies the result of a fetch previously returned by [`Self::begin`].
    pub fn complete(&mut self, fetch: &PageFetch, outcome: PageOutcome) -> PageCompletion {
        if fetch.generation != self.generation {
            self.phase = PagePhase::Idle;
            let restart = if std::mem::take(&mut self.restart_pending) {
                Some(self.start())
            } else {
                None
            };
            return PageCompletion::Stale { restart };
        }

        match outcome {
            PageOutcome::Loaded(records) => {
                let received = records.len();
                let held = std::mem::take(&mut self.accumulated);
                self.accumulated = merge_page(held, records, fetch.mode);

                if received < fetch.limit {
                    self.has_more = false;
                    self.phase = PagePhase::Exhausted;
                } else {
                    self.offset = fetch.offset + self.page_size;
                    self.phase = PagePhase::Idle;
                }
            }
            PageOutcome::Failed => {
                self.phase = PagePhase::Failed;
            }
        }

        PageCompletion::Applied
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.has_more = true;
        self.accumulated.clear();
        self.generation = self.generation.wrapping_add(1);
        if !self.is_loading() {
            self.phase = PagePhase::Idle;
        }
    }

    fn start(&mut self) -> PageFetch {
        self.phase = PagePhase::Loading;
        PageFetch {
            generation: self.generation,
            offset: self.offset,
            limit: self.page_size,
            mode: if self.offset == 0 {
                MergeMode::Replace
            } else {
                MergeMode::Append
            },
        }
    }
}
