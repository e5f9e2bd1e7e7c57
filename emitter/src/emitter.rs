//! The HTTP record emitter.
//!
//! ## Metrics
//!
//! `requests_sent`: Total number of requests sent
//! `request_ok`: Requests that received a response, labelled by status code
//! `request_failure`: Requests that received no response
//! `bytes_written`: Total bytes of request body sent
//!

use std::future::Future;

use bytes::Bytes;
use emitter_payload::Records;
use emitter_throttle::Throttle;
use http_body_util::Full;
use hyper::{
    HeaderMap, Method, Request, Uri,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use metrics::counter;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, trace};

use crate::config::{self, Config};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Emitter`].
pub enum Error {
    /// Creation of a record failed.
    #[error("Record creation error: {0}")]
    Payload(#[from] emitter_payload::Error),
    /// Wrapper around [`hyper::http::Error`].
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),
    /// The configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
}

/// Counts of the requests made over one [`Emitter::spin`].
///
/// A request still in flight at shutdown is counted as sent but neither ok nor
/// failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Requests sent
    pub requests_sent: u64,
    /// Requests answered by the target, whatever the status
    pub request_ok: u64,
    /// Requests that got no answer
    pub request_failure: u64,
}

/// The emitter.
///
/// This emitter posts one freshly generated record per throttle tick at the
/// target, waiting for each request to finish before the next tick. The
/// outcome of a request is counted and otherwise ignored: the loop runs until
/// shutdown no matter what the target does.
#[derive(Debug)]
pub struct Emitter {
    uri: Uri,
    headers: HeaderMap,
    records: Records,
    throttle: Throttle,
    rng: StdRng,
    metric_labels: Vec<(String, String)>,
}

impl Emitter {
    /// Create a new [`Emitter`] instance
    ///
    /// # Errors
    ///
    /// Creation will fail if no valid target URI can be derived from `config`.
    pub fn new(config: Config) -> Result<Self, Error> {
        let uri = config.target_uri()?;
        let throttle = Throttle::new_with_config(config.throttle());
        let rng = match config.seed {
            Some(seed) => StdRng::from_seed(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let mut metric_labels = vec![
            ("component".to_string(), "emitter".to_string()),
            (
                "variant".to_string(),
                config.payload.variant.as_str().to_string(),
            ),
        ];
        if let Some(id) = config.id {
            metric_labels.push(("id".to_string(), id));
        }

        Ok(Self {
            uri,
            headers: config.headers,
            records: Records::new(config.payload),
            throttle,
            rng,
            metric_labels,
        })
    }

    /// The URI records are posted to.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    fn request(&self, body: Vec<u8>) -> Result<Request<Full<Bytes>>, Error> {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(self.uri.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(Full::new(Bytes::from(body)))?;
        request.headers_mut().extend(self.headers.clone());
        Ok(request)
    }

    /// Run [`Emitter`] until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Function will error only if a record cannot be generated or a request
    /// cannot be assembled. Request failures are never errors.
    pub async fn spin<F>(mut self, shutdown: F) -> Result<Summary, Error>
    where
        F: Future<Output = ()>,
    {
        let client = Client::builder(TokioExecutor::new())
            .retry_canceled_requests(false)
            .build_http();
        let labels = self.metric_labels.clone();
        let mut summary = Summary::default();

        info!(uri = %self.uri, variant = self.records.variant().as_str(), "emitting records");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("shutdown signal received");
                    return Ok(summary);
                }
                () = self.throttle.wait() => {}
            }

            let body = self.records.encode(&mut self.rng)?;
            let body_length = body.len();
            let request = self.request(body)?;

            counter!("requests_sent", &labels).increment(1);
            summary.requests_sent += 1;

            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("shutdown signal received, abandoning in-flight request");
                    return Ok(summary);
                }
                result = client.request(request) => match result {
                    Ok(response) => {
                        let status = response.status();
                        counter!("bytes_written", &labels).increment(body_length as u64);
                        let mut status_labels = labels.clone();
                        status_labels.push(("status_code".to_string(), status.as_u16().to_string()));
                        counter!("request_ok", &status_labels).increment(1);
                        summary.request_ok += 1;
                        trace!("{uri} answered {status}", uri = self.uri);
                    }
                    Err(source) => {
                        let mut error_labels = labels.clone();
                        error_labels.push(("error".to_string(), source.to_string()));
                        counter!("request_failure", &error_labels).increment(1);
                        summary.request_failure += 1;
                        trace!("Failed to send HTTP request to {uri}: {source}", uri = self.uri);
                    }
                }
            }
        }
    }
}
