//! Byte contract with the out-of-process shim.
//!
//! Modules built for an architecture the host can only reach through a
//! helper process are run by a shim. The host sends one [`ShimRequest`] and
//! reads back one [`ShimResponse`]. Both are serialized with rkyv and framed
//! with a little-endian `u32` length prefix.
//!
//! ```text
//! +----------------+---------------------------+
//! | len: u32 (LE)  | rkyv archive (len bytes)  |
//! +----------------+---------------------------+
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use filterhost::shim::{frame_request, unframe_response};
//!
//! let bytes = frame_request(&request)?;
//! let reply = transport.exchange(&bytes)?;
//! let (response, _) = unframe_response(&reply)?.ok_or("truncated")?;
//! ```

use crate::engine::persist::PersistedBlock;
use crate::error::{Error, Result};

/// Size of the length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Everything the shim needs to run one filter.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
pub struct ShimRequest {
    /// Path of the module.
    pub module_path: String,
    /// Entry point to call.
    pub entry_point: String,
    /// Filter case chosen by the host.
    pub filter_case: i16,
    /// Whether this is a repeat run.
    pub repeat: bool,
    /// Persisted parameter block of an earlier run.
    pub parameters: Option<PersistedBlock>,
    /// Persisted global data of an earlier run.
    pub data: Option<PersistedBlock>,
    /// Foreground color.
    pub foreground: [u8; 3],
    /// Background color.
    pub background: [u8; 3],
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Source pixels, BGRA rows.
    pub pixels: Vec<u8>,
    /// Selection mask, one byte per pixel.
    pub mask: Option<Vec<u8>>,
}

/// What the shim reports back.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
pub struct ShimResponse {
    /// Status of the first failing phase, or 0.
    pub status: i16,
    /// Text the filter left in its error string.
    pub error_string: Option<String>,
    /// Updated parameter block.
    pub parameters: Option<PersistedBlock>,
    /// Updated global data.
    pub data: Option<PersistedBlock>,
    /// Filtered pixels, BGRA rows.
    pub pixels: Vec<u8>,
}

/// Transport to a shim process.
///
/// Implementations send one framed request and return the framed reply.
pub trait OutOfProcessShim {
    /// Exchange one request for one reply.
    fn exchange(&self, request: &[u8]) -> Result<Vec<u8>>;
}

impl<F> OutOfProcessShim for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    fn exchange(&self, request: &[u8]) -> Result<Vec<u8>> {
        self(request)
    }
}

impl std::fmt::Debug for dyn OutOfProcessShim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OutOfProcessShim")
    }
}

fn serialization(e: rkyv::rancor::Error) -> Error {
    Error::Serialization(e.to_string())
}

fn frame(serialized: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(serialized.len())
        .map_err(|_| Error::Serialization("message exceeds the frame limit".into()))?;
    let mut framed = Vec::with_capacity(LENGTH_PREFIX + serialized.len());
    framed.extend_from_slice(&len.to_le_bytes());
    framed.extend_from_slice(serialized);
    Ok(framed)
}

/// Split off one complete frame, copied into an aligned buffer.
fn split(buf: &[u8]) -> Option<(rkyv::util::AlignedVec<8>, usize)> {
    let prefix: [u8; LENGTH_PREFIX] = buf.get(..LENGTH_PREFIX)?.try_into().ok()?;
    let len = u32::from_le_bytes(prefix) as usize;
    let body = buf.get(LENGTH_PREFIX..LENGTH_PREFIX + len)?;
    let mut aligned = rkyv::util::AlignedVec::<8>::new();
    aligned.extend_from_slice(body);
    Some((aligned, LENGTH_PREFIX + len))
}

/// Frame a request for sending.
pub fn frame_request(request: &ShimRequest) -> Result<Vec<u8>> {
    let serialized = rkyv::to_bytes::<rkyv::rancor::Error>(request).map_err(serialization)?;
    frame(&serialized)
}

/// Frame a response for sending.
pub fn frame_response(response: &ShimResponse) -> Result<Vec<u8>> {
    let serialized = rkyv::to_bytes::<rkyv::rancor::Error>(response).map_err(serialization)?;
    frame(&serialized)
}

/// Decode a request and the bytes it consumed.
///
/// Returns `Ok(None)` while `buf` holds less than one frame.
pub fn unframe_request(buf: &[u8]) -> Result<Option<(ShimRequest, usize)>> {
    let Some((aligned, consumed)) = split(buf) else {
        return Ok(None);
    };
    let request =
        rkyv::from_bytes::<ShimRequest, rkyv::rancor::Error>(&aligned).map_err(serialization)?;
    Ok(Some((request, consumed)))
}

/// Decode a response and the bytes it consumed.
///
/// Returns `Ok(None)` while `buf` holds less than one frame.
pub fn unframe_response(buf: &[u8]) -> Result<Option<(ShimResponse, usize)>> {
    let Some((aligned, consumed)) = split(buf) else {
        return Ok(None);
    };
    let response =
        rkyv::from_bytes::<ShimResponse, rkyv::rancor::Error>(&aligned).map_err(serialization)?;
    Ok(Some((response, consumed)))
}
