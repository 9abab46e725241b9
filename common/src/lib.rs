//! Shared wire types for the turnsweeper client and server: board
//! parameters, client-view cell states, and the command/notification
//! protocol spoken over the WebSocket channel.

pub mod models;
pub mod protocol;
