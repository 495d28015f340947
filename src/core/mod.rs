mod engine;
mod inherited;
mod sampler;
mod tables;
mod types;

pub use engine::{
    DEFAULT_BATCH_SIZE, compute_scenarios, run_monte_carlo, run_monte_carlo_with_progress,
};
pub use inherited::inherited_withdrawal;
pub use sampler::{
    FixedReturn, FixedSource, NormalSampler, POST_RETIREMENT_VOL_SCALE, ReturnModel, RngSource,
    SampledReturn, UniformSource, derive_run_seed,
};
pub use tables::{required_minimum_distribution, single_life_factor, uniform_lifetime_factor};
pub use types::{
    GrowthBreakdown, GuaranteedIncome, IncomeSource, InheritedAccount, InheritedStrategy,
    MonteCarloProgress, MonteCarloResult, Phase, Profile, ProfileError, ScenarioOutcome,
    ScenarioResults, YearRecord,
};
