use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, Semaphore};
use url::Url;

use crate::transport_ports::{AuditTransport, TransportError, TransportErrorKind};

/// How the fake answers a request.
pub(crate) enum Responder {
    /// Serves `offset..min(offset + limit, total)` of a sequence of `total`
    /// records; each record's origin carries the `search` value.
    Total(usize),
    /// Returns the same payload for every request.
    Fixed(Value),
}

pub(crate) struct FakeTransport {
    responder: Responder,
    failing_hosts: Vec<String>,
    fail_after: Option<usize>,
    calls: Mutex<Vec<Url>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeTransport {
    pub(crate) fn new(responder: Responder) -> Self {
        Self {
            responder,
            failing_hosts: Vec::new(),
            fail_after: None,
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Answers every request to `host` with status 503.
    pub(crate) fn failing_host(mut self, host: &str) -> Self {
        self.failing_hosts.push(host.to_owned());
        self
    }

    /// Answers every request after the first `calls` with status 503.
    pub(crate) fn fail_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Holds each answer until a permit is added to the returned semaphore.
    pub(crate) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub(crate) async fn calls(&self) -> Vec<Url> {
        self.calls.lock().await.clone()
    }

    fn respond(&self, url: &Url) -> Value {
        match &self.responder {
            Responder::Fixed(payload) => payload.clone(),
            Responder::Total(total) => {
                let mut offset = 0_usize;
                let mut limit = 0_usize;
                let mut search = String::new();
                for (key, value) in url.query_pairs() {
                    match key.as_ref() {
                        "offset" => offset = value.parse().unwrap_or_default(),
                        "limit" => limit = value.parse().unwrap_or_default(),
                        "search" => search = value.into_owned(),
                        _ => {}
                    }
                }

                let end = offset.saturating_add(limit).min(*total);
                let items = (offset.min(end)..end)
                    .map(|index| {
                        let mut item = Map::new();
                        item.insert("action".to_owned(), json!(format!("event-{index}")));
                        item.insert("actor".to_owned(), json!("alice"));
                        item.insert("origin".to_owned(), json!(search));
                        item.insert(
                            "timestamp".to_owned(),
                            json!("2024-01-01T00:00:00.000Z"),
                        );
                        Value::Object(item)
                    })
                    .collect();
                Value::Array(items)
            }
        }
    }
}

#[async_trait]
impl AuditTransport for FakeTransport {
    async fn get_json(&self, url: &Url) -> Result<Value, TransportError> {
        let call_number = {
            let mut calls = self.calls.lock().await;
            calls.push(url.clone());
            calls.len()
        };

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let exhausted = self.fail_after.is_some_and(|limit| call_number > limit);
        let failing = exhausted
            || url
                .host_str()
                .is_some_and(|host| self.failing_hosts.iter().any(|failing| failing == host));
        if failing {
            return Err(TransportError::new(url, TransportErrorKind::Status(503)));
        }

        Ok(self.respond(url))
    }
}
