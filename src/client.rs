use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use http::{Request, Response, Uri};
use tokio_util::sync::CancellationToken;

use crate::{
    config::HedgeConfig,
    errors::{ConfigError, HedgeError},
    hedger::Hedger,
    stats::Stats,
    transport::{HyperTransport, Transport},
};

/// An HTTP client that hedges every request it sends.
///
/// Each request is sent once immediately and then duplicated at a fixed interval
/// until one copy succeeds, implementing the "hedged requests" pattern to reduce
/// tail latency. Only use it for requests that are safe to send more than once.
#[derive(Debug)]
pub struct HedgedClient<T = HyperTransport> {
    hedger: Hedger<T>,
}

impl<T> Clone for HedgedClient<T> {
    fn clone(&self) -> Self {
        Self {
            hedger: self.hedger.clone(),
        }
    }
}

impl HedgedClient<HyperTransport> {
    /// Creates a client over the default transport, returning it together with
    /// its stats.
    ///
    /// # Example
    /// ```no_run
    /// use hedged_http::HedgedClient;
    /// use std::time::Duration;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let (client, stats) = HedgedClient::new(Duration::from_millis(50), 3)?;
    ///
    /// let response = client.get("http://127.0.0.1:8080/health".parse()?).await?;
    /// println!("status={} {}", response.status(), stats.snapshot());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(interval: Duration, max_attempts: usize) -> Result<(Self, Arc<Stats>), ConfigError> {
        let client = Self::from_config(HedgeConfig::new(interval, max_attempts)?);
        let stats = client.stats();
        Ok((client, stats))
    }

    pub fn from_config(config: HedgeConfig) -> Self {
        Self {
            hedger: Hedger::with_defaults(config),
        }
    }
}

impl<T: Transport> HedgedClient<T> {
    /// Creates a client that sends each attempt through `transport`.
    pub fn with_transport(config: HedgeConfig, transport: T) -> Self {
        Self {
            hedger: Hedger::new(config, transport),
        }
    }

    pub fn hedger(&self) -> &Hedger<T> {
        &self.hedger
    }

    pub fn stats(&self) -> Arc<Stats> {
        self.hedger.stats()
    }

    /// Sends `request`, hedging it until one attempt succeeds.
    pub async fn request(&self, request: Request<Bytes>) -> Result<Response<T::Body>, HedgeError> {
        self.hedger.execute(request).await
    }

    /// Sends `request`, giving up once `cancel` fires.
    pub async fn request_with(
        &self,
        request: Request<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<Response<T::Body>, HedgeError> {
        self.hedger.execute_with(request, cancel).await
    }

    /// Sends a bodiless `GET` to `uri`.
    pub async fn get(&self, uri: Uri) -> Result<Response<T::Body>, HedgeError> {
        let mut request = Request::new(Bytes::new());
        *request.uri_mut() = uri;
        self.request(request).await
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use http_body_util::Empty;

    use super::*;
    use crate::transport::{transport_fn, BoxError};

    #[test]
    fn new_rejects_zero_attempts() {
        assert_eq!(
            HedgedClient::new(Duration::from_secs(1), 0).unwrap_err(),
            ConfigError::InvalidMaxAttempts(0)
        );
    }

    #[test]
    fn new_returns_shared_stats() {
        let (client, stats) = HedgedClient::new(Duration::from_millis(10), 3).unwrap();
        assert!(Arc::ptr_eq(&client.stats(), &stats));
        assert_eq!(client.hedger().config().max_attempts(), 3);
    }

    #[tokio::test]
    async fn get_sends_bodiless_get() {
        let client = HedgedClient::with_transport(
            HedgeConfig::new(Duration::from_millis(10), 2).unwrap(),
            transport_fn(|req: Request<Bytes>| async move {
                if req.method() != Method::GET
                    || req.uri() != "http://backend.local/items"
                    || !req.body().is_empty()
                {
                    return Err::<Response<Empty<Bytes>>, BoxError>(
                        format!("unexpected request {req:?}").into(),
                    );
                }
                Ok(Response::new(Empty::<Bytes>::new()))
            }),
        );

        let response = client
            .get(Uri::from_static("http://backend.local/items"))
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(client.stats().actual_round_trips(), 1);
    }

    #[tokio::test]
    async fn closure_transport_call_can_be_spawned() {
        let client = HedgedClient::with_transport(
            HedgeConfig::new(Duration::from_millis(10), 2).unwrap(),
            transport_fn(|_req: Request<Bytes>| async {
                Ok::<_, BoxError>(Response::new(Empty::<Bytes>::new()))
            }),
        );

        let spawned = {
            let client = client.clone();
            tokio::spawn(async move {
                let mut request = Request::new(Bytes::new());
                *request.uri_mut() = Uri::from_static("http://backend.local/");
                client.request(request).await.is_ok()
            })
        };

        assert!(spawned.await.unwrap());
        assert_eq!(client.stats().requested_round_trips(), 1);
    }
}
