//! Where dice faces come from.
//!
//! The engine never touches a random number generator directly; it asks a
//! [`FaceSource`] for one face per die. Production rooms use
//! [`RandomFaces`], tests feed exact rolls through [`ScriptedFaces`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lcr_protocol::Face;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The seven equally likely faces of one die.
///
/// Dot appears three times, every other face once.
pub const FACE_TABLE: [Face; 7] = [
    Face::Dot,
    Face::Dot,
    Face::Dot,
    Face::Left,
    Face::Right,
    Face::Wild,
    Face::Hub,
];

/// Produces one die face per call.
pub trait FaceSource: Send {
    fn draw(&mut self) -> Face;
}

/// Uniform draws from [`FACE_TABLE`].
#[derive(Debug)]
pub struct RandomFaces<R = StdRng> {
    rng: R,
}

impl RandomFaces<StdRng> {
    /// Seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomFaces<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> FaceSource for RandomFaces<R> {
    fn draw(&mut self) -> Face {
        FACE_TABLE[self.rng.random_range(0..FACE_TABLE.len())]
    }
}

/// Replays queued faces in order, then rolls [`Face::Dot`] forever.
///
/// Clones share one queue, so a test can hand a clone to a room and keep
/// queuing rolls from outside.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFaces {
    queue: Arc<Mutex<VecDeque<Face>>>,
}

impl ScriptedFaces {
    pub fn new(faces: impl IntoIterator<Item = Face>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(faces.into_iter().collect())),
        }
    }

    /// Appends faces to the end of the script.
    pub fn push(&self, faces: &[Face]) {
        self.lock().extend(faces.iter().copied());
    }

    /// Faces left before the script runs dry.
    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Face>> {
        // A panic while holding this lock leaves a valid queue behind.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FaceSource for ScriptedFaces {
    fn draw(&mut self) -> Face {
        self.lock().pop_front().unwrap_or(Face::Dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_table_has_three_dots() {
        let dots = FACE_TABLE.iter().filter(|f| **f == Face::Dot).count();
        assert_eq!(dots, 3);
        for face in [Face::Left, Face::Right, Face::Hub, Face::Wild] {
            assert_eq!(FACE_TABLE.iter().filter(|f| **f == face).count(), 1);
        }
    }

    #[test]
    fn test_random_faces_same_seed_same_sequence() {
        let mut a = RandomFaces::seeded(7);
        let mut b = RandomFaces::seeded(7);
        let first: Vec<Face> = (0..50).map(|_| a.draw()).collect();
        let second: Vec<Face> = (0..50).map(|_| b.draw()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_random_faces_hits_every_face() {
        let mut faces = RandomFaces::seeded(42);
        let drawn: Vec<Face> = (0..2_000).map(|_| faces.draw()).collect();
        for face in FACE_TABLE {
            assert!(drawn.contains(&face), "{face} never came up");
        }
    }

    #[test]
    fn test_scripted_faces_replays_then_defaults_to_dot() {
        let mut faces = ScriptedFaces::new([Face::Wild, Face::Hub]);
        assert_eq!(faces.draw(), Face::Wild);
        assert_eq!(faces.draw(), Face::Hub);
        assert_eq!(faces.draw(), Face::Dot);
        assert_eq!(faces.remaining(), 0);
    }

    #[test]
    fn test_scripted_faces_clones_share_the_queue() {
        let script = ScriptedFaces::default();
        let mut handed_out = script.clone();
        script.push(&[Face::Left, Face::Right]);
        assert_eq!(handed_out.draw(), Face::Left);
        assert_eq!(script.remaining(), 1);
    }
}
