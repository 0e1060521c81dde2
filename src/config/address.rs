//! Listen address parsing.

use std::{fmt, path::PathBuf};

use super::ConfigProblem;

/// Where the consumer listens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenAddress {
    /// A TCP `host:port` pair. The host may be a name, an IPv4 address or a
    /// bracketed IPv6 address.
    Tcp(String),
    /// A Unix domain stream socket at the given path.
    Unix(PathBuf),
}

impl ListenAddress {
    /// Parse an `Address` option.
    ///
    /// Accepted forms are `:port` (all interfaces), `host:port`,
    /// `tcp://host:port` (also `tcp4://`, `tcp6://`) and `unix://path`.
    ///
    /// # Errors
    /// Returns [`ConfigProblem::UnsupportedProtocol`] for datagram or unknown
    /// schemes, and [`ConfigProblem::InvalidAddress`] for anything that is not
    /// a usable address.
    ///
    /// # Examples
    ///
    /// ```
    /// use relayframe::ListenAddress;
    ///
    /// assert_eq!(
    ///     ListenAddress::parse(":5880"),
    ///     Ok(ListenAddress::Tcp("0.0.0.0:5880".into()))
    /// );
    /// assert!(ListenAddress::parse("udp://localhost:5880").is_err());
    /// ```
    pub fn parse(address: &str) -> Result<Self, ConfigProblem> {
        let (protocol, target) = match address.split_once("://") {
            Some((protocol, target)) => (protocol.to_ascii_lowercase(), target),
            None => ("tcp".to_owned(), address),
        };

        match protocol.as_str() {
            "tcp" | "tcp4" | "tcp6" => parse_tcp(target)
                .map(Self::Tcp)
                .ok_or_else(|| ConfigProblem::InvalidAddress(address.to_owned())),
            "unix" if !target.is_empty() => Ok(Self::Unix(PathBuf::from(target))),
            "unix" => Err(ConfigProblem::InvalidAddress(address.to_owned())),
            _ => Err(ConfigProblem::UnsupportedProtocol(protocol)),
        }
    }
}

fn parse_tcp(target: &str) -> Option<String> {
    let (host, port) = target.rsplit_once(':')?;
    port.parse::<u16>().ok()?;
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return None;
    }
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Some(format!("{host}:{port}"))
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}
