//! Connection and seat-claim bookkeeping for the LCR server.
//!
//! This crate answers two questions the connection handler keeps asking:
//!
//! 1. **Which rooms is this connection watching?** So that a dropped
//!    socket can be detached from every room it was in
//!    ([`SessionManager::disconnect`]).
//! 2. **Which seat does this claim secret belong to?** So that a new
//!    socket can take a seat back after a dropped one
//!    ([`SessionManager::reclaim`]), as long as it comes back within the
//!    reconnect grace period.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / handler (above)  ← asks who is where, routes reclaims
//!     ↕
//! Session layer (this crate)  ← connections, subscriptions, seat claims
//!     ↕
//! Protocol layer (below)  ← ConnectionId, RoomCode, SeatIndex
//! ```
//!
//! The rooms themselves stay authoritative: a claim this crate accepts is
//! still checked against the seat by the room before it is honored.

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::{SessionManager, generate_claim};
pub use session::{ClaimState, SeatClaim, Session, SessionConfig};
