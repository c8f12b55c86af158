//! Room lifecycle for the LCR game server.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! [`lcr_engine::Room`] and the channels of everyone watching it. The
//! actor applies commands one at a time, fans the resulting events out to
//! its subscribers, and runs the reconnect grace timer for every seat whose
//! player dropped.
//!
//! # Key types
//!
//! - [`RoomStore`]: creates rooms, finds them by code; [`sweep`] removes idle ones
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`GameAction`]: the turn-protocol commands a seated player sends
//! - [`RoomConfig`]: grace period, idle timeout, name length, channel size

mod config;
mod error;
mod room;
mod store;

pub use config::RoomConfig;
pub use error::RoomError;
pub use room::{EventSender, GameAction, RoomHandle, RoomInfo};
pub use store::{RoomStore, sweep};
