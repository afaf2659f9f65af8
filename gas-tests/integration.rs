//! Integration tests for Gas
//!
//! These tests drive a tracker end to end: through the simulated sender to
//! check the exact wire format, and through the HTTP sender against an
//! in-process collector.

#[path = "integration/wire_format.rs"]
mod wire_format;

#[path = "integration/http_transport.rs"]
mod http_transport;
