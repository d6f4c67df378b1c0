//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_view;
mod endpoint_resolver;
mod fetch_controller;
#[cfg(test)]
mod test_support;
mod transport_ports;
mod view_config;

pub use audit_view::{
    AuditViewSession, PendingPage, ScrollCoalescer, ScrollSettings, ScrollSignal, ViewEvent,
    ViewHandle, ViewSnapshot, fetch_records,
};
pub use endpoint_resolver::{EndpointResolver, ResolvedEndpoints};
pub use fetch_controller::{
    ENTITY_CATALOG_RESOURCE, FetchError, PageRequest, PagedFetchController, RawPage,
};
pub use transport_ports::{AuditTransport, TransportError, TransportErrorKind};
pub use view_config::{
    DEFAULT_ENTITIES, DEFAULT_FALLBACK_ADDRESS, DEFAULT_PAGE_SIZE, DEFAULT_PRIMARY_ADDRESS,
    DEFAULT_SCROLL_INTERVAL, DEFAULT_SCROLL_THRESHOLD_PX, ViewConfig,
};
