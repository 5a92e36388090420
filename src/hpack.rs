//! HPACK: Header Compression for HTTP/2 (RFC 7541)
//!
//! Thin wrapper around `fluke-hpack`. The frame codec never looks inside a
//! header block; this module exists so the probe can build its request
//! block and show the response headers it gets back.

/// One header field, lossily converted to UTF-8 for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H2Header {
    pub name: String,
    pub value: String,
}

impl H2Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is_pseudo(&self) -> bool {
        self.name.starts_with(':')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("HPACK decode error: {0}")]
pub struct HpackError(String);

/// Response-side decoder. Keep one per connection: the dynamic table
/// carries over between header blocks.
pub struct HpackDecoder {
    inner: fluke_hpack::Decoder<'static>,
}

impl std::fmt::Debug for HpackDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HpackDecoder").finish()
    }
}

impl Default for HpackDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HpackDecoder {
    pub fn new() -> Self {
        Self {
            inner: fluke_hpack::Decoder::new(),
        }
    }

    /// Decode a complete header block (after CONTINUATION reassembly).
    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<H2Header>, HpackError> {
        let pairs = self.inner.decode(data).map_err(|e| HpackError(format!("{e:?}")))?;
        Ok(pairs
            .into_iter()
            .map(|(name, value)| {
                H2Header::new(
                    String::from_utf8_lossy(&name).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                )
            })
            .collect())
    }
}

/// Request-side encoder, one per connection.
pub struct HpackEncoder {
    inner: fluke_hpack::Encoder<'static>,
}

impl std::fmt::Debug for HpackEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HpackEncoder").finish()
    }
}

impl Default for HpackEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HpackEncoder {
    pub fn new() -> Self {
        Self {
            inner: fluke_hpack::Encoder::new(),
        }
    }

    pub fn encode(&mut self, headers: &[H2Header]) -> Vec<u8> {
        let pairs: Vec<(&[u8], &[u8])> = headers
            .iter()
            .map(|h| (h.name.as_bytes(), h.value.as_bytes()))
            .collect();
        self.inner.encode(pairs)
    }
}

/// Request pseudo-headers for a bodiless GET.
pub fn get_request_headers(scheme: &str, authority: &str, path: &str) -> Vec<H2Header> {
    vec![
        H2Header::new(":method", "GET"),
        H2Header::new(":scheme", scheme),
        H2Header::new(":path", path),
        H2Header::new(":authority", authority),
    ]
}
