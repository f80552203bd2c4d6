use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Source of centred noise for simulated price moves.
pub trait Jitter: Send + Sync {
    /// A sample in `[-0.5, 0.5)`.
    fn sample(&self) -> f64;
}

/// Seeded RNG behind a mutex; seed 0 draws a fresh seed.
#[derive(Debug)]
pub struct RandomJitter {
    rng: Mutex<StdRng>,
}

impl RandomJitter {
    pub fn new(seed: u64) -> Self {
        let seed = if seed == 0 {
            rand::thread_rng().gen()
        } else {
            seed
        };
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomJitter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Jitter for RandomJitter {
    fn sample(&self) -> f64 {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen::<f64>() - 0.5
    }
}

/// Replays a fixed list of samples, cycling when it runs out.
#[cfg(test)]
pub(crate) struct FixedJitter {
    samples: Vec<f64>,
    next: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FixedJitter {
    pub(crate) fn new(samples: &[f64]) -> Self {
        Self {
            samples: samples.to_vec(),
            next: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl Jitter for FixedJitter {
    fn sample(&self) -> f64 {
        let i = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.samples[i % self.samples.len()]
    }
}
