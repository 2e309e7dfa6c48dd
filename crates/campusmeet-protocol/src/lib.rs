//! Request/response types and JSON codec for the campusmeet service.
//!
//! # Envelope Structure
//!
//! Every message is wrapped in an [`Envelope`] containing:
//! - `protocol_version`: Always "1" for this version
//! - `request_id`: Caller-chosen ID for request/response correlation
//! - `payload`: The actual request or response
//!
//! Messages are plain JSON documents. Streams carry one message per line.
//!
//! # Example
//!
//! ```rust
//! use campusmeet_protocol::{Envelope, Request, encode_message, decode_request};
//!
//! let request = Envelope::request("req-1", Request::Ping);
//! let bytes = encode_message(&request).unwrap();
//! let decoded = decode_request(&bytes).unwrap();
//! assert_eq!(decoded.payload, Request::Ping);
//! ```

mod codec;
mod error;
mod types;

pub use codec::{LineReader, LineWriter, decode_message, decode_request, encode_message};
pub use error::{ProtocolError, ProtocolResult};
pub use types::{Envelope, ErrorCode, ErrorResponse, Request, Response};

/// Protocol version constant.
pub const PROTOCOL_VERSION: &str = "1";

/// Maximum message size (1 MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
