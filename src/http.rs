//! HTTP/1.0 request and response helpers
//!
//! Just enough HTTP for a single GET over the raw connection.

use thiserror::Error;

pub const DEFAULT_HTTP_PORT: u16 = 80;

/// File name used when the URL path names a directory
pub const DEFAULT_FILE_NAME: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("only http:// URLs are supported: {0}")]
    UnsupportedScheme(String),
    #[error("URL has no host: {0}")]
    MissingHost(String),
    #[error("bad port in URL: {0}")]
    BadPort(String),
    #[error("response has no header terminator")]
    IncompleteHead,
    #[error("malformed status line: {0}")]
    BadStatusLine(String),
}

/// Where the GET goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    pub host: String,
    pub port: u16,
    /// Path plus query, always starting with `/`
    pub path: String,
}

impl HttpTarget {
    /// Parse `http://host[:port][/path]`.
    pub fn parse(url: &str) -> Result<Self, HttpError> {
        let rest = url
            .strip_prefix("http://")
            .ok_or_else(|| HttpError::UnsupportedScheme(url.to_string()))?;

        let (authority, path) = match rest.find(['/', '?']) {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        // Fragments never go on the wire
        let path = path.split('#').next().unwrap_or_default();
        let path = match path {
            "" => "/".to_string(),
            p if p.starts_with('?') => format!("/{}", p),
            p => p.to_string(),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| HttpError::BadPort(url.to_string()))?;
                (host, port)
            }
            None => (authority, DEFAULT_HTTP_PORT),
        };
        if host.is_empty() {
            return Err(HttpError::MissingHost(url.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path,
        })
    }

    /// Value for the Host header; the port is only spelled out when non-default
    pub fn host_header(&self) -> String {
        if self.port == DEFAULT_HTTP_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// `GET <path> HTTP/1.0` plus a Host header, terminated by a blank line.
pub fn build_get_request(target: &HttpTarget) -> Vec<u8> {
    format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\n\r\n",
        target.path,
        target.host_header()
    )
    .into_bytes()
}

/// Local file name for a URL path: its last segment, or `index.html`.
pub fn output_file_name(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_FILE_NAME.to_string(),
    }
}

/// Status line and body of a complete response
#[derive(Debug, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: u16,
    pub head: &'a [u8],
    pub body: &'a [u8],
}

/// Split a raw response into status code, head and body.
pub fn split_response(raw: &[u8]) -> Result<Response<'_>, HttpError> {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(HttpError::IncompleteHead)?;
    let head = &raw[..end];
    let body = &raw[end + 4..];

    let line_end = head.windows(2).position(|w| w == b"\r\n").unwrap_or(head.len());
    let status_line = String::from_utf8_lossy(&head[..line_end]);

    let mut parts = status_line.split_whitespace();
    let status = match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code.parse::<u16>().ok(),
        _ => None,
    }
    .ok_or_else(|| HttpError::BadStatusLine(status_line.to_string()))?;

    Ok(Response { status, head, body })
}
