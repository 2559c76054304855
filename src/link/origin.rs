//! Trusted origin check
//!
//! The single authentication point for inbound datagrams. An exact address
//! pins both host and port; a bare host accepts any port on that host.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::errors::{RecorderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustedOrigin {
    Exact(SocketAddr),
    Host(IpAddr),
}

impl TrustedOrigin {
    /// Whether a sender is allowed to reach the logs
    pub fn matches(&self, origin: &SocketAddr) -> bool {
        match self {
            TrustedOrigin::Exact(addr) => addr == origin,
            TrustedOrigin::Host(ip) => *ip == origin.ip(),
        }
    }

    /// Address requests can be sent to, if the origin pins one
    pub fn peer(&self) -> Option<SocketAddr> {
        match self {
            TrustedOrigin::Exact(addr) => Some(*addr),
            TrustedOrigin::Host(_) => None,
        }
    }
}

impl FromStr for TrustedOrigin {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("udp://").unwrap_or(trimmed);

        if let Ok(addr) = trimmed.parse::<SocketAddr>() {
            return Ok(TrustedOrigin::Exact(addr));
        }
        if let Ok(ip) = trimmed.parse::<IpAddr>() {
            return Ok(TrustedOrigin::Host(ip));
        }

        Err(RecorderError::ConfigError(format!(
            "Invalid trusted origin '{}': expected HOST:PORT or HOST",
            s
        )))
    }
}

impl fmt::Display for TrustedOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustedOrigin::Exact(addr) => write!(f, "{}", addr),
            TrustedOrigin::Host(ip) => write!(f, "{} (any port)", ip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_and_host() {
        let exact: TrustedOrigin = "127.0.0.1:7070".parse().unwrap();
        assert_eq!(exact, TrustedOrigin::Exact("127.0.0.1:7070".parse().unwrap()));

        let host: TrustedOrigin = "udp://10.0.0.5".parse().unwrap();
        assert_eq!(host, TrustedOrigin::Host("10.0.0.5".parse().unwrap()));

        assert!("gazefilter.app".parse::<TrustedOrigin>().is_err());
    }

    #[test]
    fn test_exact_match_requires_port() {
        let origin: TrustedOrigin = "127.0.0.1:7070".parse().unwrap();

        assert!(origin.matches(&"127.0.0.1:7070".parse().unwrap()));
        assert!(!origin.matches(&"127.0.0.1:7071".parse().unwrap()));
        assert!(!origin.matches(&"127.0.0.2:7070".parse().unwrap()));
    }

    #[test]
    fn test_host_match_any_port() {
        let origin: TrustedOrigin = "127.0.0.1".parse().unwrap();

        assert!(origin.matches(&"127.0.0.1:1".parse().unwrap()));
        assert!(origin.matches(&"127.0.0.1:65000".parse().unwrap()));
        assert!(!origin.matches(&"192.168.1.1:7070".parse().unwrap()));
        assert!(origin.peer().is_none());
    }
}
