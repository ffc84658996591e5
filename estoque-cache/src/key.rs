//! Cache key construction and canonical encoding.
//!
//! Two logically-equivalent lookups must serialize to byte-identical keys.
//! Keys are therefore built through [`CacheKey`], which validates every
//! segment up front and renders parameter objects with a canonical
//! (sorted-key) encoding.

use estoque_core::{CacheError, CacheResult, Namespace};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Delimiter between the namespace tag and identifier segments.
const DELIMITER: char = ':';

/// A validated cache key: a namespace tag plus ordered identifier segments.
///
/// Encodes to `"<namespace>:<seg>[:<seg>...]"`, colon-delimited and
/// case-sensitive. Construction is the only place validation happens;
/// a `CacheKey` in hand is always safe to send to the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    segments: Vec<String>,
}

impl CacheKey {
    /// Create a key from a namespace and identifier segments.
    ///
    /// Segments that are empty or contain the `:` delimiter are rejected
    /// with [`CacheError::InvalidKey`] before any store round-trip.
    pub fn new<I, S>(namespace: Namespace, segments: I) -> CacheResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self {
            namespace,
            segments,
        })
    }

    /// Create a key with no identifier segments (a namespace singleton).
    pub fn bare(namespace: Namespace) -> Self {
        Self {
            namespace,
            segments: Vec::new(),
        }
    }

    /// Append a validated segment.
    pub fn push<S: Into<String>>(mut self, segment: S) -> CacheResult<Self> {
        let segment = segment.into();
        validate_segment(&segment)?;
        self.segments.push(segment);
        Ok(self)
    }

    /// Append a UUID segment. UUIDs render without the delimiter, so this
    /// cannot fail.
    pub fn push_uuid(mut self, id: Uuid) -> Self {
        self.segments.push(id.to_string());
        self
    }

    /// Append a parameter object as a canonical segment.
    ///
    /// Object keys are sorted recursively before rendering, so
    /// `{a:1,b:2}` and `{b:2,a:1}` produce the same segment. The rendered
    /// JSON contains no `:` at the key level because the segment is
    /// percent-style escaped: `:` is replaced by `%3A`.
    pub fn push_params(mut self, params: &Value) -> Self {
        let canonical = canonical_json(params);
        let rendered = canonical.to_string().replace(DELIMITER, "%3A");
        self.segments.push(rendered);
        self
    }

    /// The namespace this key belongs to.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// The identifier segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Render the canonical key string sent to the store.
    pub fn encode(&self) -> String {
        let mut out = String::from(self.namespace.as_str());
        for segment in &self.segments {
            out.push(DELIMITER);
            out.push_str(segment);
        }
        out
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// A key prefix denoting a set of keys to invalidate together.
///
/// A prefix of `sync:logs` with leading segment `integration-7` matches
/// `sync:logs:integration-7` itself and everything under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix {
    namespace: Namespace,
    leading: Vec<String>,
}

impl KeyPrefix {
    /// A prefix covering an entire namespace.
    pub fn namespace(namespace: Namespace) -> Self {
        Self {
            namespace,
            leading: Vec::new(),
        }
    }

    /// A prefix covering a namespace narrowed by leading segments.
    pub fn scoped<I, S>(namespace: Namespace, leading: I) -> CacheResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let leading: Vec<String> = leading.into_iter().map(Into::into).collect();
        for segment in &leading {
            validate_segment(segment)?;
        }
        Ok(Self { namespace, leading })
    }

    /// Render the prefix string used for store scans.
    pub fn encode(&self) -> String {
        let mut out = String::from(self.namespace.as_str());
        for segment in &self.leading {
            out.push(DELIMITER);
            out.push_str(segment);
        }
        out
    }

    /// Whether an encoded key falls under this prefix.
    ///
    /// Matches the prefix exactly or followed by a delimiter, so the
    /// prefix `sync:logs:int-1` does not match `sync:logs:int-10`.
    pub fn matches(&self, encoded_key: &str) -> bool {
        let prefix = self.encode();
        match encoded_key.strip_prefix(prefix.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with(DELIMITER),
            None => false,
        }
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

fn validate_segment(segment: &str) -> CacheResult<()> {
    if segment.is_empty() {
        return Err(CacheError::InvalidKey {
            segment: segment.to_string(),
            reason: "segment is empty".to_string(),
        });
    }
    if segment.contains(DELIMITER) {
        return Err(CacheError::InvalidKey {
            segment: segment.to_string(),
            reason: "segment contains the ':' delimiter".to_string(),
        });
    }
    Ok(())
}

/// Recursively sort object keys so semantically-equal parameter objects
/// render identically.
fn canonical_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), canonical_json(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_json).collect()),
        other => other.clone(),
    }
}
