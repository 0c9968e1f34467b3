//! Stream assembler
//!
//! Records arrive in generation order. Shuffling first and then stably
//! sorting by timestamp reproduces out-of-order arrival followed by
//! resequencing: the result is always in timestamp order, while records that
//! share a timestamp come out in a different relative order on every run.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::models::Timestamped;

/// Shuffle, then stable-sort ascending by timestamp.
pub fn assemble<T, R>(mut records: Vec<T>, rng: &mut R) -> Vec<T>
where
    T: Timestamped,
    R: Rng + ?Sized,
{
    records.shuffle(rng);
    records.sort_by_key(|record| record.timestamp());
    debug!(records = records.len(), "Assembled stream");
    records
}

/// True when no record precedes its predecessor in time.
pub fn is_time_ordered<T: Timestamped>(records: &[T]) -> bool {
    records
        .windows(2)
        .all(|pair| pair[0].timestamp() <= pair[1].timestamp())
}
