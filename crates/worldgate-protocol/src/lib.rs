//! Wire types for the worldgate line protocol.
//!
//! A client opens one TCP connection per request, writes a single UTF-8 JSON
//! object terminated by a newline, and reads a single JSON line back before
//! the server closes the connection:
//!
//! ```json
//! {"token":"…","action":"setblock","params":{"x":1,"y":64,"z":1,"block":"stone"}}
//! ```
//!
//! ```json
//! {"success":true,"data":1}
//! {"success":false,"error":"Invalid token","data":null}
//! ```
//!
//! Both the daemon and the client crate share these types so the envelope
//! rules (absent token means empty, absent params means an empty mapping)
//! live in exactly one place.

mod errors;
mod request;
mod response;

pub use errors::ProtocolError;
pub use request::{MAX_REQUEST_BYTES, Params, RequestEnvelope, strip_line_ending};
pub use response::Response;
