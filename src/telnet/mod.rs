//! Minimal telnet client
//!
//! Just enough of RFC 854 to hold a line-oriented shell session with a
//! detector controller: option negotiation is refused, everything else is
//! text.

pub mod codec;
mod session;

pub use session::TelnetSession;
