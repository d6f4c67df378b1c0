//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod reqwest_audit_transport;

pub use reqwest_audit_transport::ReqwestAuditTransport;
