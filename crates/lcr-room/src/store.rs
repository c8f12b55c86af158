//! Room store: creates rooms, finds them by code, sweeps idle ones.

use std::collections::HashMap;

use lcr_engine::{FaceSource, RandomFaces};
use lcr_protocol::{ROOM_CODE_ALPHABET, ROOM_CODE_LEN, RoomCode};
use rand::Rng;
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle};

/// All live rooms, keyed by code.
///
/// The store itself is plain data; the server keeps it behind a mutex and
/// only holds the lock long enough to look up or clone a handle. Talking
/// to a room happens through the handle, outside the lock.
pub struct RoomStore {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: RoomConfig,
}

impl RoomStore {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Opens a room with OS-seeded dice and returns its code.
    pub fn create(&mut self) -> RoomCode {
        self.create_with_faces(Box::new(RandomFaces::from_os_rng()))
    }

    /// Opens a room whose dice come from `dice`.
    pub fn create_with_faces(&mut self, dice: Box<dyn FaceSource>) -> RoomCode {
        let code = self.unused_code();
        let handle = spawn_room(code.clone(), self.config.clone(), dice);
        self.rooms.insert(code.clone(), handle);
        tracing::info!(room = %code, rooms = self.rooms.len(), "room created");
        code
    }

    /// Draws random codes until one is not in use.
    fn unused_code(&self) -> RoomCode {
        let mut rng = rand::rng();
        loop {
            let raw: String = (0..ROOM_CODE_LEN)
                .map(|_| {
                    char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())])
                })
                .collect();
            if let Ok(code) = RoomCode::parse(&raw) {
                if !self.rooms.contains_key(&code) {
                    return code;
                }
            }
        }
    }

    /// A handle to the room with this code.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no such room is live.
    pub fn get(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Handles to every live room.
    pub fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    /// Takes a room out of the store. The caller shuts it down.
    pub fn remove(&mut self, code: &RoomCode) -> Option<RoomHandle> {
        let handle = self.rooms.remove(code);
        if handle.is_some() {
            tracing::info!(room = %code, rooms = self.rooms.len(), "room removed");
        }
        handle
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

/// Removes rooms that have been idle longer than the configured timeout,
/// and rooms whose actor no longer answers. Returns the removed codes.
///
/// Each room decides for itself whether it is idle and stops in the same
/// step, so a player joining during the sweep is never dropped with the
/// room. Rooms are asked without holding the store lock.
pub async fn sweep(store: &Mutex<RoomStore>) -> Vec<RoomCode> {
    let (handles, idle_timeout) = {
        let store = store.lock().await;
        (store.handles(), store.config.idle_timeout)
    };

    let mut stopped = Vec::new();
    for handle in handles {
        match handle.shutdown_if_idle(idle_timeout).await {
            Ok(true) => stopped.push(handle.code().clone()),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(room = %handle.code(), %err, "room not answering, removing");
                stopped.push(handle.code().clone());
            }
        }
    }

    let mut store = store.lock().await;
    stopped
        .into_iter()
        .filter(|code| store.remove(code).is_some())
        .collect()
}
