/// HTTP transport seam for the schedule fetcher.
///
/// The fetcher issues exactly one GET per invocation. Routing it through
/// `Transport` lets development mode replay a saved feed and lets tests
/// count outbound calls.

use thiserror::Error;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request could not be completed at the transport level.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

pub trait Transport {
    /// Issues a GET to `url` with the given query parameters.
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
        (**self).get(url, query)
    }
}

/// Live transport over a blocking `reqwest` client.
///
/// No timeout is configured beyond the client's default.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
