//! Random return sampling. The uniform source is an injectable dependency so
//! tests can feed a fixed sequence of draws and check the resulting normal
//! variate against a known value.

use std::f64::consts::PI;

use rand::Rng as _;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::types::{Phase, Profile};

/// Post-retirement portfolios are assumed to be allocated more conservatively,
/// so sampled volatility is scaled down relative to the accumulation phase.
pub const POST_RETIREMENT_VOL_SCALE: f64 = 0.6;

/// Sampled annual returns are clamped to a plausible band so a single extreme
/// draw cannot produce non-finite balances downstream.
const RETURN_CLAMP: (f64, f64) = (-0.95, 2.5);

/// One uniform variate in [0, 1) per call.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

/// Production source backed by a seeded `SmallRng`.
pub struct RngSource {
    rng: SmallRng,
}

impl RngSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl UniformSource for RngSource {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Deterministic source for tests: replays a fixed sequence of uniforms.
pub struct FixedSource {
    draws: Vec<f64>,
    index: usize,
}

impl FixedSource {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, index: 0 }
    }
}

impl UniformSource for FixedSource {
    fn next_uniform(&mut self) -> f64 {
        let draw = self.draws.get(self.index).copied().unwrap_or(0.5);
        self.index += 1;
        draw
    }
}

/// Normally distributed samples via the Box-Muller transform over two
/// uniforms, caching the second variate of each pair.
pub struct NormalSampler<S: UniformSource> {
    source: S,
    cached: Option<f64>,
}

impl<S: UniformSource> NormalSampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    pub fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached.take() {
            return z;
        }
        let u1 = self.source.next_uniform().max(1e-12);
        let u2 = self.source.next_uniform();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        self.cached = Some(r * theta.sin());
        r * theta.cos()
    }

    pub fn sample(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard_normal()
    }
}

/// Source of the annual return applied in one projected year. Implemented by
/// both the fixed-rate scenario engine and the stochastic Monte Carlo engine
/// so they share the same projection code.
pub trait ReturnModel {
    fn annual_return(&mut self, phase: Phase) -> f64;
}

/// Fixed returns with an additive adjustment, used by the scenario engine.
#[derive(Copy, Clone, Debug)]
pub struct FixedReturn {
    pre_retirement: f64,
    post_retirement: f64,
}

impl FixedReturn {
    pub fn from_profile(profile: &Profile, adjustment: f64) -> Self {
        Self {
            pre_retirement: profile.pre_retirement_return + adjustment,
            post_retirement: profile.post_retirement_return + adjustment,
        }
    }
}

impl ReturnModel for FixedReturn {
    fn annual_return(&mut self, phase: Phase) -> f64 {
        match phase {
            Phase::Accumulating => self.pre_retirement,
            Phase::Distributing => self.post_retirement,
        }
    }
}

/// Randomly sampled returns with phase-appropriate mean and volatility.
pub struct SampledReturn<S: UniformSource> {
    pre_mean: f64,
    post_mean: f64,
    pre_vol: f64,
    post_vol: f64,
    sampler: NormalSampler<S>,
}

impl<S: UniformSource> SampledReturn<S> {
    pub fn from_profile(profile: &Profile, source: S) -> Self {
        let vol = profile.standard_deviation.max(0.0);
        Self {
            pre_mean: profile.pre_retirement_return,
            post_mean: profile.post_retirement_return,
            pre_vol: vol,
            post_vol: vol * POST_RETIREMENT_VOL_SCALE,
            sampler: NormalSampler::new(source),
        }
    }
}

impl<S: UniformSource> ReturnModel for SampledReturn<S> {
    fn annual_return(&mut self, phase: Phase) -> f64 {
        let (mean, vol) = match phase {
            Phase::Accumulating => (self.pre_mean, self.pre_vol),
            Phase::Distributing => (self.post_mean, self.post_vol),
        };
        self.sampler
            .sample(mean, vol)
            .clamp(RETURN_CLAMP.0, RETURN_CLAMP.1)
    }
}

/// Splitmix-style mixer used to derive an independent seed per simulation run
/// from the base seed, keeping runs order-independent.
pub fn derive_run_seed(base_seed: u64, run_index: u32) -> u64 {
    let mut z = base_seed ^ ((run_index as u64).wrapping_add(1) << 32);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
