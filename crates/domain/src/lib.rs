//! Domain entities and invariants for audit history browsing.

#![forbid(unsafe_code)]

mod accumulator;
mod filter;
mod pagination;
mod record;

pub use accumulator::{MergeMode, merge_page};
pub use filter::{
    ACTOR_FIELD, API_PATH_FIELD, AUTHOR_FIELD, ClauseStyle, ENTITY_HISTORY_RESOURCE,
    ENTITY_NAME_FIELD, EVENT_TIME_FIELD, FROM_FIELD, FilterCriteria, OPERATION_FIELD,
    OperatorDialect, QueryField, QueryOperator, QueryValue, ResourceProfile, TO_FIELD,
    build_query, build_query_fields, render_plain_query, render_query,
};
pub use pagination::{PageCompletion, PageFetch, PageOutcome, PagePhase, PageState, PageTrigger};
pub use record::{AuditElement, AuditRecord, element_value, normalize_records};
