use std::time::Duration;

use bytes::Bytes;
use http::{Request, StatusCode, header};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio::time;
use tokio_rustls::TlsConnector;

use super::error::{Error, Result};
use super::{PROBE_HEADER, PortProber, Protocol, tls};

/// Classifies a port by talking to it: first plain HTTP, then a TLS handshake.
#[derive(Clone)]
pub struct NetworkProber {
    attempt_timeout: Duration,
    tls: TlsConnector,
}

impl std::fmt::Debug for NetworkProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkProber")
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}

impl NetworkProber {
    /// Creates a prober whose HTTP and TLS attempts are each bounded by `attempt_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS client cannot be configured.
    pub fn new(attempt_timeout: Duration) -> Result<Self> {
        Ok(Self {
            attempt_timeout,
            tls: tls::probe_connector()?,
        })
    }

    /// Sends `GET /` over a fresh connection and returns the response status.
    async fn probe_http(&self, host: &str, port: u16) -> Result<StatusCode> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(Error::Connect)?;
        let (mut sender, conn) =
            hyper::client::conn::http1::handshake::<_, Empty<Bytes>>(TokioIo::new(stream))
                .await
                .map_err(Error::Http)?;

        let request = Request::get("/")
            .header(header::HOST, format!("{host}:{port}"))
            .header(PROBE_HEADER, "true")
            .body(Empty::<Bytes>::new())?;

        let response = sender.send_request(request);
        tokio::pin!(conn);
        tokio::pin!(response);

        tokio::select! {
            biased;
            response = &mut response => {
                return response.map(|response| response.status()).map_err(Error::Http);
            }
            _ = &mut conn => {}
        }

        // the connection may close right after handing over the response
        response
            .await
            .map(|response| response.status())
            .map_err(Error::Http)
    }

    /// Completes a TLS handshake over a fresh connection.
    async fn probe_https(&self, host: &str, port: u16) -> Result<()> {
        let server_name = ServerName::try_from(host)
            .map_err(|source| Error::InvalidServerName {
                host: host.to_owned(),
                source,
            })?
            .to_owned();
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(Error::Connect)?;
        self.tls
            .connect(server_name, stream)
            .await
            .map_err(Error::Tls)?;
        Ok(())
    }
}

impl PortProber for NetworkProber {
    async fn probe(&self, host: &str, port: u16) -> Option<Protocol> {
        match time::timeout(self.attempt_timeout, self.probe_http(host, port)).await {
            Ok(Ok(status)) => {
                log::debug!("http://{}:{} returned {}", host, port, status);
                return Some(Protocol::Http);
            }
            Ok(Err(err)) => log::debug!("http://{}:{} not reachable: {}", host, port, err),
            Err(_) => log::debug!("http://{}:{} timed out", host, port),
        }

        match time::timeout(self.attempt_timeout, self.probe_https(host, port)).await {
            Ok(Ok(())) => {
                log::debug!("https://{}:{} completed TLS handshake", host, port);
                Some(Protocol::Https)
            }
            Ok(Err(err)) => {
                log::debug!("https://{}:{} not reachable: {}", host, port, err);
                None
            }
            Err(_) => {
                log::debug!("https://{}:{} timed out", host, port);
                None
            }
        }
    }
}
