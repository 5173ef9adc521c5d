use std::sync::{LazyLock, Mutex};

use dyn_clone::DynClone;
use rand::{rngs::StdRng, Rng, SeedableRng};

pub static SHARED_RNG: LazyLock<Mutex<StdRng>> =
    LazyLock::new(|| Mutex::new(StdRng::seed_from_u64(1234)));

pub fn seed_spaces_rng(seed: u64) {
    let mut rng = SHARED_RNG.lock().unwrap_or_else(|e| e.into_inner());
    *rng = StdRng::seed_from_u64(seed);
}

/// Defines a space in which a action, observation, or other may exist
pub trait Space<T: Clone>: DynClone {
    /// tests whether the sample is contained within the space
    fn contains(&self, sample: &T) -> bool;

    /// randomly samples from the space
    fn sample(&mut self) -> T;

    /// returns some semantic representation of the space of
    /// the space, to be used for initialising models
    fn shape(&self) -> T;
}

dyn_clone::clone_trait_object!(<T> Space<T> where T: Clone);

/// Defines a `BoxSpace<T>`.
///
/// A `BoxSpace` is an n-dimensional container on
/// some generic `T`, where `T` is classically some
/// form of number. Rotor speeds and stacked poses are
/// both `BoxSpace<Vec<f32>>`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace<T> {
    /// The lower bound on the space
    low: T,

    /// The upper bound on the space
    high: T,
}

impl From<(Vec<f32>, Vec<f32>)> for BoxSpace<Vec<f32>> {
    fn from(value: (Vec<f32>, Vec<f32>)) -> Self {
        assert_eq!(
            value.0.len(),
            value.1.len(),
            "BoxSpace bounds must have the same length"
        );

        Self {
            low: value.0,
            high: value.1,
        }
    }
}

impl Space<Vec<f32>> for BoxSpace<Vec<f32>> {
    fn contains(&self, sample: &Vec<f32>) -> bool {
        if sample.len() != self.low.len() {
            return false;
        }

        sample
            .iter()
            .zip(self.low.iter())
            .zip(self.high.iter())
            .all(|((&s, &l), &h)| l <= s && s <= h)
    }

    fn sample(&mut self) -> Vec<f32> {
        let mut rng = SHARED_RNG.lock().unwrap_or_else(|e| e.into_inner());
        self.low
            .iter()
            .zip(self.high.iter())
            .map(|(&l, &h)| rng.random_range(l..=h))
            .collect()
    }

    fn shape(&self) -> Vec<f32> {
        self.low.clone()
    }
}

impl BoxSpace<Vec<f32>> {
    /// Same bound for every one of `n` dimensions.
    pub fn uniform(n: usize, low: f32, high: f32) -> Self {
        Self::from((vec![low; n], vec![high; n]))
    }

    /// Concatenates `n` copies of this space.
    pub fn repeat(&self, n: usize) -> Self {
        Self::from((self.low.repeat(n), self.high.repeat(n)))
    }

    pub fn low(&self) -> &Vec<f32> {
        &self.low
    }

    pub fn high(&self) -> &Vec<f32> {
        &self.high
    }
}
