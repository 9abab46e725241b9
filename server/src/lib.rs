//! Authoritative server for turn-based multiplayer minesweeper.
//!
//! All mutable state of one match lives in a [`logic::Session`] and is only
//! touched under that session's lock, so commands apply one at a time and
//! notifications go out in the order the mutations happened.

pub mod cleanup;
pub mod cors;
pub mod data;
pub mod logic;
pub mod rate_limit;
pub mod routes;
pub mod turns;
