//! Remote fetch boundary
//!
//! The retrieval engine treats the feature server as an opaque
//! `fetch(uri) -> bytes` operation. [`HttpClient`] is that seam; the
//! [`ReqwestClient`] implementation adds a timeout and identifying headers.
//!
//! ```ignore
//! use whiffy::provider::{HttpClient, HttpConfig, ReqwestClient};
//!
//! let client = ReqwestClient::new(&HttpConfig::default())?;
//! let body = client.get("https://example.com/wfs?request=GetCapabilities")?;
//! ```

mod http;
mod types;

pub use http::{HttpClient, HttpConfig, ReqwestClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use types::TransportError;

#[cfg(test)]
pub use http::tests::{MockHttpClient, ScriptedHttpClient};
