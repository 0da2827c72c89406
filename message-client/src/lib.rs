//! Client for a text-message directory service.
//!
//! A user registers a name, connects to open a session, sends short messages
//! to other users by name, and disconnects. Requests are synchronous
//! request/reply exchanges over short-lived TCP connections; while a user is
//! connected, a background listener receives messages the server pushes.
//!
//! - [`wire`] encodes and decodes the NUL-terminated field framing.
//! - [`codes`] maps reply bytes to per-operation outcomes.
//! - [`transport`] opens request connections and the ephemeral listening socket.
//! - [`listener`] runs the push listener task and stops it with a sentinel.
//! - [`session`] is the state machine behind REGISTER, UNREGISTER, CONNECT,
//!   DISCONNECT and SEND.
//! - [`filter`] rewrites message bodies before they are sent.
//! - [`shell`] and [`cli`] form the interactive front end.
//!
//! Integration tests drive [`session::Session`] against an in-process fake
//! directory server.

pub mod cli;
pub mod codes;
pub mod config;
pub mod filter;
pub mod listener;
pub mod session;
pub mod shell;
pub mod transport;
pub mod wire;
