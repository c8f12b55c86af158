//! # LCR
//!
//! Authoritative server for four-seat Left-Center-Right dice with Wild
//! faces, played by browser clients over WebSocket.
//!
//! Each room is a single actor task that owns its game state; clients send
//! JSON commands, the room validates and applies them atomically, and every
//! state change is pushed back to the table as events.
//!
//! ## Layers
//!
//! - [`lcr_transport`]: WebSocket accept/send/recv
//! - [`lcr_protocol`]: commands, events and the JSON codec
//! - [`lcr_engine`]: the game rules, with no I/O
//! - [`lcr_session`]: live connections and reconnect claims
//! - [`lcr_room`]: room actors and the room store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lcr::prelude::*;
//!
//! # async fn run() -> Result<(), LcrError> {
//! let server = LcrServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::LcrError;
pub use server::{LcrServer, LcrServerBuilder};

pub use lcr_engine;
pub use lcr_protocol;
pub use lcr_room;
pub use lcr_session;
pub use lcr_transport;

/// Everything needed to start a server and talk its protocol.
pub mod prelude {
    pub use crate::{LcrError, LcrServer, LcrServerBuilder};
    pub use lcr_protocol::{
        ChipHolder, ClientCommand, Codec, ErrorCode, Face, JsonCodec, Phase, RoomCode,
        ServerEvent, StateSnapshot, TripleWildChoice, WildAction,
    };
    pub use lcr_room::RoomConfig;
    pub use lcr_session::SessionConfig;
}
