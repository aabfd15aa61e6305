//! URL match patterns.
//!
//! # Grammar
//! ```text
//! <pattern> := "<all_urls>" | <scheme> "://" <host> <path>
//! <scheme>  := "*" | "http" | "https" | "ws" | "wss"
//! <host>    := "*" | "*." <domain> | <domain>   (optionally ":" <port> | ":*")
//! <path>    := "/" <any chars, "*" matches any run>
//! ```
//!
//! # Design Decisions
//! - Scheme `*` covers http, https, ws and wss only
//! - `*.example.com` also matches `example.com` itself
//! - Host matching is case-insensitive, path matching is not
//! - Path patterns are matched against path plus query
//! - A host without a port matches any port

use std::fmt;
use std::str::FromStr;

use url::Url;

const WILDCARD_SCHEMES: &[&str] = &["http", "https", "ws", "wss"];

/// Error type for pattern parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern `{0}` is missing `://`")]
    MissingSeparator(String),
    #[error("pattern `{0}` has an unsupported scheme")]
    InvalidScheme(String),
    #[error("pattern `{0}` has an invalid host")]
    InvalidHost(String),
    #[error("pattern `{0}` has an invalid port")]
    InvalidPort(String),
    #[error("pattern `{0}` has no path")]
    MissingPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SchemeMatch {
    Any,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMatch {
    Any,
    /// `*.domain`: the domain or any subdomain of it.
    Suffix(String),
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PortMatch {
    Any,
    Exact(u16),
}

/// A compiled match pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    source: String,
    all_urls: bool,
    scheme: SchemeMatch,
    host: HostMatch,
    port: PortMatch,
    path: String,
}

impl MatchPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let source = pattern.to_string();
        if pattern == "<all_urls>" {
            return Ok(Self {
                source,
                all_urls: true,
                scheme: SchemeMatch::Any,
                host: HostMatch::Any,
                port: PortMatch::Any,
                path: "/*".to_string(),
            });
        }

        let (scheme, rest) = pattern
            .split_once("://")
            .ok_or_else(|| PatternError::MissingSeparator(source.clone()))?;

        let scheme = match scheme {
            "*" => SchemeMatch::Any,
            s if WILDCARD_SCHEMES.contains(&s) => SchemeMatch::Exact(s.to_string()),
            _ => return Err(PatternError::InvalidScheme(source)),
        };

        let slash = rest
            .find('/')
            .ok_or_else(|| PatternError::MissingPath(source.clone()))?;
        let (authority, path) = rest.split_at(slash);

        let (host, port) = match authority.rsplit_once(':') {
            // Bracketed IPv6 literal without a port.
            Some((_, tail)) if tail.ends_with(']') => (authority, PortMatch::Any),
            Some((host, "*")) => (host, PortMatch::Any),
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| PatternError::InvalidPort(source.clone()))?;
                (host, PortMatch::Exact(port))
            }
            None => (authority, PortMatch::Any),
        };

        let host = match host {
            "" => return Err(PatternError::InvalidHost(source)),
            "*" => HostMatch::Any,
            h if h.starts_with("*.") => {
                let domain = &h[2..];
                if domain.is_empty() || domain.contains('*') {
                    return Err(PatternError::InvalidHost(source));
                }
                HostMatch::Suffix(domain.to_ascii_lowercase())
            }
            h if h.contains('*') => return Err(PatternError::InvalidHost(source)),
            h => HostMatch::Exact(h.to_ascii_lowercase()),
        };

        Ok(Self {
            source,
            all_urls: false,
            scheme,
            host,
            port,
            path: path.to_string(),
        })
    }

    /// The pattern text as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, url: &Url) -> bool {
        let scheme_ok = match &self.scheme {
            SchemeMatch::Any => WILDCARD_SCHEMES.contains(&url.scheme()),
            SchemeMatch::Exact(s) => url.scheme() == s,
        };
        if !scheme_ok {
            return false;
        }
        if self.all_urls {
            return true;
        }

        let host = match url.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return false,
        };
        let host_ok = match &self.host {
            HostMatch::Any => true,
            HostMatch::Exact(expected) => host == *expected,
            HostMatch::Suffix(domain) => {
                host == *domain
                    || (host.len() > domain.len()
                        && host.ends_with(domain.as_str())
                        && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
            }
        };
        if !host_ok {
            return false;
        }

        let port_ok = match self.port {
            PortMatch::Any => true,
            PortMatch::Exact(p) => url.port_or_known_default() == Some(p),
        };
        if !port_ok {
            return false;
        }

        let target = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        glob_match(&self.path, &target)
    }
}

impl FromStr for MatchPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Glob match where `*` matches any run of characters, `/` included.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some(pi);
            pi += 1;
            mark = ti;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}
