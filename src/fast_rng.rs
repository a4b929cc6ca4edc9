// Per-event random number stream.
//
// A PCG-LCG generator with a single u64 of state. Each event gets its own
// stream, derived from the run seed by skipping the LCG ahead, so an event can
// be reproduced on its own without replaying the events before it.

use rand::{RngCore, SeedableRng};

const PRN_MULT: u64 = 6364136223846793005;
const PRN_ADD: u64 = 1442695040888963407;
/// Number of LCG steps reserved for one event
const EVENT_STRIDE: u64 = 152917;

/// PCG (RXS-M-XS output) on top of a 64-bit LCG.
#[derive(Clone, Copy, Debug)]
pub struct FastRng {
    state: u64,
}

impl FastRng {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Stream for one event of a run: the run seed advanced by
    /// `event_id * EVENT_STRIDE` LCG steps.
    pub fn for_event(run_seed: u64, event_id: u64) -> Self {
        Self {
            state: skip_ahead(run_seed, event_id.wrapping_mul(EVENT_STRIDE)),
        }
    }

    /// Uniform f64 in [0, 1)
    #[inline(always)]
    pub fn uniform(&mut self) -> f64 {
        // top 53 bits of the permuted output
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    #[inline(always)]
    fn step(&mut self) -> u64 {
        self.state = PRN_MULT.wrapping_mul(self.state).wrapping_add(PRN_ADD);
        let word = ((self.state >> ((self.state >> 59) + 5)) ^ self.state)
            .wrapping_mul(12605985483714917081);
        (word >> 43) ^ word
    }
}

/// Advance an LCG state by `n` steps in O(log n) (Brown, "Random number
/// generation with arbitrary strides").
fn skip_ahead(seed: u64, mut n: u64) -> u64 {
    let mut g = PRN_MULT;
    let mut c = PRN_ADD;
    let mut g_new: u64 = 1;
    let mut c_new: u64 = 0;

    while n > 0 {
        if n & 1 == 1 {
            g_new = g_new.wrapping_mul(g);
            c_new = c_new.wrapping_mul(g).wrapping_add(c);
        }
        c = g.wrapping_add(1).wrapping_mul(c);
        g = g.wrapping_mul(g);
        n >>= 1;
    }
    g_new.wrapping_mul(seed).wrapping_add(c_new)
}

impl SeedableRng for FastRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }
}

impl RngCore for FastRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
