/// Development mode: replay a saved schedule feed
///
/// When the live ShiftAdmin API is unavailable (no key, no network), point
/// the service at a JSON body saved from an earlier fetch. Every request is
/// answered with the same response, whatever the date window.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use crate::ingest::transport::{HttpResponse, Transport, TransportError};

/// Transport that answers every GET with one canned response.
pub struct ReplayTransport {
    response: HttpResponse,
    calls: Cell<usize>,
}

impl ReplayTransport {
    /// Serve the contents of a saved feed file with status 200.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let body = fs::read_to_string(path)
            .map_err(|e| TransportError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_body(200, body))
    }

    pub fn from_body(status: u16, body: impl Into<String>) -> Self {
        Self {
            response: HttpResponse { status, body: body.into() },
            calls: Cell::new(0),
        }
    }

    /// Number of requests served so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Transport for ReplayTransport {
    fn get(&self, _url: &str, _query: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.response.clone())
    }
}
