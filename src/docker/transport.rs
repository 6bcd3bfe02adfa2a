use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bytes::Bytes;
use http::{Request, header};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};

use super::error::{Error, Result};

/// Address of the engine API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Path of a Unix domain socket, e.g. `/var/run/docker.sock`.
    Unix(PathBuf),
    /// `host:port` of a plain TCP listener.
    Tcp(String),
}

impl FromStr for Endpoint {
    type Err = Error;

    /// Parses `unix:///path`, `tcp://host:port` or `http://host:port`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix://") {
            if !path.is_empty() {
                return Ok(Self::Unix(PathBuf::from(path)));
            }
        } else if let Some(addr) = s
            .strip_prefix("tcp://")
            .or_else(|| s.strip_prefix("http://"))
        {
            let addr = addr.trim_end_matches('/');
            if !addr.is_empty() {
                return Ok(Self::Tcp(addr.to_owned()));
            }
        }

        Err(Error::UnsupportedEndpoint(s.to_owned()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// Issues HTTP/1.1 requests against the engine, one connection per request.
#[derive(Debug, Clone)]
pub struct Transport {
    endpoint: Endpoint,
}

impl Transport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Performs a `GET` and returns the body of a successful response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] if the endpoint is unreachable, [`Error::Http`] on protocol
    /// failures and [`Error::Status`] for non-2xx answers.
    pub async fn get(&self, path_and_query: &str) -> Result<Bytes> {
        log::trace!("GET {} via {}", path_and_query, self.endpoint);
        match &self.endpoint {
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|source| self.connect_error(source))?;
                send_get(stream, path_and_query).await
            }
            Endpoint::Tcp(addr) => {
                let stream = tokio::net::TcpStream::connect(addr.as_str())
                    .await
                    .map_err(|source| self.connect_error(source))?;
                send_get(stream, path_and_query).await
            }
        }
    }

    fn connect_error(&self, source: std::io::Error) -> Error {
        Error::Connect {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }
}

async fn send_get<S>(stream: S, path_and_query: &str) -> Result<Bytes>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Empty<Bytes>>(
        TokioIo::new(stream),
    )
    .await
    .map_err(Error::Http)?;
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            log::debug!("Engine connection closed with error: {}", err);
        }
    });

    let request = Request::get(path_and_query)
        .header(header::HOST, "docker")
        .header(header::ACCEPT, "application/json")
        .body(Empty::<Bytes>::new())?;
    let response = sender.send_request(request).await.map_err(Error::Http)?;
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(Error::Http)?
        .to_bytes();

    if !status.is_success() {
        return Err(Error::Status {
            status,
            message: String::from_utf8_lossy(&body).trim().to_owned(),
        });
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unix_endpoint() {
        let endpoint: Endpoint = "unix:///var/run/docker.sock".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Unix(PathBuf::from("/var/run/docker.sock")));
        assert_eq!(endpoint.to_string(), "unix:///var/run/docker.sock");
    }

    #[test]
    fn test_parse_tcp_endpoints() {
        let endpoint: Endpoint = "tcp://10.0.0.2:2375".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Tcp("10.0.0.2:2375".to_owned()));

        let endpoint: Endpoint = "http://localhost:2375/".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Tcp("localhost:2375".to_owned()));
    }

    #[test]
    fn test_parse_unsupported_endpoints() {
        for raw in ["", "unix://", "tcp://", "ssh://user@host", "/var/run/docker.sock"] {
            let err = raw.parse::<Endpoint>().unwrap_err();
            assert!(matches!(err, Error::UnsupportedEndpoint(_)), "input {raw:?}");
        }
    }
}
