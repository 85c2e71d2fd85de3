//! Random team ordering and invite codes.

use rand::Rng;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;

use crate::tournament::TeamId;

const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of private tournament invite codes
pub const INVITE_CODE_LEN: usize = 6;

/// Randomizes team order before a schedule is generated
pub struct TeamShuffler<R: Rng = ThreadRng> {
    rng: R,
}

impl TeamShuffler {
    /// Create a shuffler over the thread-local generator
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl Default for TeamShuffler {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> TeamShuffler<R> {
    /// Create a shuffler over a caller-supplied generator
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Shuffle team order in place
    pub fn shuffle(&mut self, teams: &mut [TeamId]) {
        teams.shuffle(&mut self.rng);
    }

    /// Random six-character uppercase alphanumeric code
    pub fn invite_code(&mut self) -> String {
        (0..INVITE_CODE_LEN)
            .map(|_| INVITE_ALPHABET[self.rng.random_range(0..INVITE_ALPHABET.len())] as char)
            .collect()
    }
}

/// Shuffle with the thread-local generator
pub fn shuffle_teams(teams: &mut [TeamId]) {
    TeamShuffler::new().shuffle(teams);
}

/// Invite code from the thread-local generator
pub fn generate_invite_code() -> String {
    TeamShuffler::new().invite_code()
}
