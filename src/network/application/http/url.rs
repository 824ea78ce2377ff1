//! Minimal URL splitting.

use super::error::Error;
use alloc::format;
use alloc::string::String;

/// The protocols the client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn is_secure(self) -> bool {
        self == Scheme::Https
    }
}

/// A request target split into the parts the session needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Whether the port was spelled out in the URL.
    pub explicit_port: bool,
    /// Path and query, always starting with `/`, spaces percent-encoded.
    pub path: String,
}

impl Url {
    /// Splits `scheme://host[:port][/path]`.
    ///
    /// Only literal spaces in the path are encoded; everything else is sent
    /// as given.
    pub fn parse(url: &str) -> Result<Self, Error> {
        let (scheme, rest) = url.split_once("://").ok_or(Error::UnsupportedScheme)?;
        let scheme = match scheme {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return Err(Error::UnsupportedScheme),
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, "/"),
        };

        let (host, port, explicit_port) = match authority.split_once(':') {
            Some((host, port)) => (
                host,
                port.parse::<u16>().map_err(|_| Error::InvalidUrl)?,
                true,
            ),
            None => (authority, scheme.default_port(), false),
        };
        if host.is_empty() {
            return Err(Error::InvalidUrl);
        }

        Ok(Self {
            scheme,
            host: String::from(host),
            port,
            explicit_port,
            path: path.replace(' ', "%20"),
        })
    }

    /// `scheme://host[:port]`, with the port only when it was explicit.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.authority())
    }

    /// The `Host` header value.
    pub fn authority(&self) -> String {
        if self.explicit_port {
            format!("{}:{}", self.host, self.port)
        } else {
            self.host.clone()
        }
    }
}
