//! Crash Arena - authoritative telnet game server
//!
//! Players connect over plain telnet, steer ASCII cars around a shared arena,
//! ram each other, drop bombs and chase hearts until one car is left.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod matchmaking;
pub mod net;
pub mod util;
