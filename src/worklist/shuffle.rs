//! Upload order randomization
//!
//! Keys sharing a long common prefix tend to land on the same storage
//! partition. Uploading in random order spreads the write load.

use super::WorkList;
use rand::seq::SliceRandom;
use rand::Rng;

impl WorkList {
    /// Permute the list uniformly at random.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    /// Permute the list with a caller-supplied random source.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.entries.shuffle(rng);
    }
}
