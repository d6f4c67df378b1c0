use std::time::Duration;

use auditlens_core::{AppError, AppResult};
use url::Url;

/// Primary base address used when none is configured.
pub const DEFAULT_PRIMARY_ADDRESS: &str = "https://localhost:5555";
/// Fallback base address used when none is configured.
pub const DEFAULT_FALLBACK_ADDRESS: &str = "https://127.0.0.1:5555";
/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Distance from the bottom, in pixels, at which a scroll loads more.
pub const DEFAULT_SCROLL_THRESHOLD_PX: u32 = 1000;
/// Minimum spacing between two scroll evaluations.
pub const DEFAULT_SCROLL_INTERVAL: Duration = Duration::from_millis(100);
/// Entity names offered when the entity catalog cannot be loaded.
pub const DEFAULT_ENTITIES: [&str; 5] = ["User", "Project", "Customer", "Timesheet", "Audit"];

/// Options injected into a view at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    /// Primary base address; [`DEFAULT_PRIMARY_ADDRESS`] when absent.
    pub primary_address: Option<Url>,
    /// Fallback base address; [`DEFAULT_FALLBACK_ADDRESS`] when absent.
    pub fallback_address: Option<Url>,
    /// Records requested per page.
    pub page_size: usize,
    /// Scroll proximity threshold in pixels.
    pub scroll_threshold_px: u32,
    /// Scroll coalescing window.
    pub scroll_interval: Duration,
    /// Entity names used when the entity catalog is unreachable.
    pub default_entities: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            primary_address: None,
            fallback_address: None,
            page_size: DEFAULT_PAGE_SIZE,
            scroll_threshold_px: DEFAULT_SCROLL_THRESHOLD_PX,
            scroll_interval: DEFAULT_SCROLL_INTERVAL,
            default_entities: DEFAULT_ENTITIES.iter().map(|name| (*name).to_owned()).collect(),
        }
    }
}

impl ViewConfig {
    /// Checks option ranges.
    pub fn validate(&self) -> AppResult<()> {
        if self.page_size == 0 {
            return Err(AppError::Validation(
                "page size must be greater than zero".to_owned(),
            ));
        }

        if self.scroll_interval.is_zero() {
            return Err(AppError::Validation(
                "scroll interval must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}
