//! Header entries and the per-request header mapping.
//!
//! # Responsibilities
//! - Capture request headers in the order they were received
//! - Flatten them into a mapping (last value wins)
//! - Strip hop-by-hop headers before observing or forwarding
//!
//! # Design Decisions
//! - Names compare ASCII-case-insensitively, as HTTP header names do
//! - A repeated name keeps the slot of its first occurrence, so the
//!   mapping iterates in original order
//! - Values are kept as raw bytes so obs-text (Latin-1) survives the relay
//! - Mappings are never persisted; one lives for one intercepted request

use std::borrow::Cow;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Headers that describe a single connection and are never observed,
/// forwarded, or relayed.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true for headers scoped to one hop.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .collect();

    for name in HOP_BY_HOP.iter().copied().map(String::from).chain(listed) {
        headers.remove(name.as_str());
    }
}

/// One request header as observed at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: String,
    pub value: Vec<u8>,
}

impl HeaderEntry {
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Snapshot a header map in iteration order, values byte for byte.
    pub fn from_header_map(headers: &HeaderMap) -> Vec<HeaderEntry> {
        headers
            .iter()
            .map(|(name, value)| HeaderEntry {
                name: name.as_str().to_string(),
                value: value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Value for display; non-UTF-8 bytes are replaced.
    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Flattened, ordered view of a header sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    entries: Vec<HeaderEntry>,
}

impl HeaderMapping {
    /// Build a mapping; a repeated name overwrites the earlier value.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a HeaderEntry>,
    {
        let mut mapping = Self::default();
        for entry in entries {
            mapping.insert(&entry.name, &entry.value);
        }
        mapping
    }

    pub fn insert(&mut self, name: &str, value: &[u8]) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.value = value.to_vec(),
            None => self.entries.push(HeaderEntry::new(name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.value.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_slice()))
    }

    /// Convert to an outbound header map.
    ///
    /// Hop-by-hop and framing headers (`Host`, `Content-Length`) are left
    /// out; the client sets its own. Fails on the first name or value that
    /// cannot be encoded.
    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeader> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            if is_hop_by_hop(&entry.name)
                || entry.name.eq_ignore_ascii_case("host")
                || entry.name.eq_ignore_ascii_case("content-length")
            {
                tracing::trace!(name = %entry.name, "Skipping connection-scoped header");
                continue;
            }
            let name = HeaderName::from_bytes(entry.name.as_bytes())
                .map_err(|_| InvalidHeader(entry.name.clone()))?;
            let value = HeaderValue::from_bytes(&entry.value)
                .map_err(|_| InvalidHeader(entry.name.clone()))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

/// A captured header that cannot be put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("header `{0}` cannot be encoded")]
pub struct InvalidHeader(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<HeaderEntry> {
        pairs.iter().map(|(n, v)| HeaderEntry::new(*n, *v)).collect()
    }

    #[test]
    fn test_unique_names_map_exactly() {
        let input = entries(&[
            ("Accept", "*/*"),
            ("X-UT-SID", "c0ffee"),
            ("User-Agent", "tap-test"),
        ]);
        let mapping = HeaderMapping::from_entries(&input);

        assert_eq!(mapping.len(), 3);
        let pairs: Vec<_> = mapping.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("Accept", &b"*/*"[..]),
                ("X-UT-SID", &b"c0ffee"[..]),
                ("User-Agent", &b"tap-test"[..])
            ]
        );
    }

    #[test]
    fn test_duplicate_name_last_value_wins() {
        let input = entries(&[("X-Token", "v1"), ("Accept", "*/*"), ("X-Token", "v2")]);
        let mapping = HeaderMapping::from_entries(&input);

        assert_eq!(mapping.get("X-Token"), Some(&b"v2"[..]));
        assert_eq!(mapping.len(), 2);
        // First slot is kept.
        assert_eq!(mapping.iter().next(), Some(("X-Token", &b"v2"[..])));
    }

    #[test]
    fn test_names_compare_case_insensitively() {
        let input = entries(&[("x-token", "a"), ("X-Token", "b")]);
        let mapping = HeaderMapping::from_entries(&input);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("X-TOKEN"), Some(&b"b"[..]));
    }

    #[test]
    fn test_header_map_skips_framing_headers() {
        let input = entries(&[
            ("Host", "example.service"),
            ("Content-Length", "12"),
            ("Connection", "keep-alive"),
            ("Authorization", "Bearer abc"),
        ]);
        let map = HeaderMapping::from_entries(&input).to_header_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("authorization").unwrap(), "Bearer abc");
    }

    #[test]
    fn test_header_map_rejects_bad_name() {
        let input = entries(&[("bad name", "x")]);
        let err = HeaderMapping::from_entries(&input).to_header_map().unwrap_err();
        assert_eq!(err, InvalidHeader("bad name".into()));
    }

    #[test]
    fn test_non_utf8_value_is_kept_byte_for_byte() {
        let mut headers = HeaderMap::new();
        headers.insert("x-name", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let captured = HeaderEntry::from_header_map(&headers);
        assert_eq!(captured[0].value, b"caf\xe9");
        assert_eq!(captured[0].value_lossy(), "caf\u{fffd}");

        let map = HeaderMapping::from_entries(&captured).to_header_map().unwrap();
        assert_eq!(map.get("x-name").unwrap().as_bytes(), b"caf\xe9");
    }

    #[test]
    fn test_header_map_rejects_control_bytes() {
        let input = vec![HeaderEntry::new("x-bad", b"a\nb".to_vec())];
        let err = HeaderMapping::from_entries(&input).to_header_map().unwrap_err();
        assert_eq!(err, InvalidHeader("x-bad".into()));
    }

    #[test]
    fn test_strip_hop_by_hop_honors_connection_list() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("close, x-private"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert("proxy-connection", HeaderValue::from_static("keep-alive"));
        headers.insert("accept", HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("accept"));
    }
}
