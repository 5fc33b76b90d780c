//! Telnet transport - sessions, keystroke decoding and outbound writers

pub mod connection;
pub mod session;
pub mod telnet;
