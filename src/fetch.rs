use base64::Engine;
use std::time::Duration;

/// A fetch that did not produce usable bytes. Extraction recovers from this
/// by keeping the referencing node in place; it never aborts a run.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub uri: String,
    pub reason: String,
}

impl FetchFailure {
    pub fn new(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}

/// Retrieves the bytes behind a stylesheet reference. Implementations must
/// not panic; every failure mode is reported through `FetchFailure`.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchFailure>;
}

/// Scheme-dispatching fetcher: `data:` URIs are decoded locally, `http(s)`
/// goes through a blocking client, anything else is read from the
/// filesystem (with an optional `file://` prefix).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFetcher;

impl ResourceFetcher for DefaultFetcher {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchFailure> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(FetchFailure::new(uri, "empty uri"));
        }
        if uri.starts_with("data:") {
            return decode_data_uri(uri)
                .ok_or_else(|| FetchFailure::new(uri, "undecodable data uri"));
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return fetch_http(uri);
        }
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        std::fs::read(path).map_err(|err| FetchFailure::new(uri, err.to_string()))
    }
}

fn fetch_http(uri: &str) -> Result<Vec<u8>, FetchFailure> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|err| FetchFailure::new(uri, format!("failed to create http client: {err}")))?;
    let response = client
        .get(uri)
        .send()
        .map_err(|err| FetchFailure::new(uri, format!("request failed: {err}")))?;
    if !response.status().is_success() {
        return Err(FetchFailure::new(uri, format!("http status {}", response.status())));
    }
    response
        .bytes()
        .map(|bytes| bytes.to_vec())
        .map_err(|err| FetchFailure::new(uri, format!("failed to read body: {err}")))
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.as_bytes())
            .ok()
    } else {
        decode_percent_encoded(payload)
    }
}

fn decode_percent_encoded(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0usize;
    while idx < bytes.len() {
        match bytes[idx] {
            b'%' => {
                if idx + 2 >= bytes.len() {
                    return None;
                }
                let hi = hex_nibble(bytes[idx + 1])?;
                let lo = hex_nibble(bytes[idx + 2])?;
                out.push((hi << 4) | lo);
                idx += 3;
            }
            other => {
                out.push(other);
                idx += 1;
            }
        }
    }
    Some(out)
}

fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
