use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Withdrawal strategy for an inherited account under the 10-year rule.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritedStrategy {
    /// Annual withdrawals sized by the single-life expectancy factor.
    AnnualRmd,
    /// Nothing until the 10th year after inheritance, then the full balance.
    #[serde(rename = "year_10_lump_sum")]
    Year10LumpSum,
    /// Nothing while more than 3 years remain, then even spreading.
    BackLoaded,
    /// `balance / years_remaining` every year.
    #[default]
    SpreadEvenly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Accumulating,
    Distributing,
}

/// A guaranteed income stream that starts at a claiming age and compounds
/// by a cost-of-living adjustment from that age onward.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuaranteedIncome {
    pub amount: f64,
    pub start_age: u32,
    pub cola_rate: f64,
}

/// An arbitrary named income source active within a [start, end] age window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncomeSource {
    pub name: String,
    pub amount: f64,
    pub start_age: u32,
    pub end_age: u32,
    /// When set, the amount compounds at the profile inflation rate from the
    /// source's own start age.
    pub inflation_adjusted: bool,
}

/// An inherited tax-deferred account subject to the 10-year depletion rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InheritedAccount {
    pub balance: f64,
    pub year_inherited: i32,
    pub strategy: InheritedStrategy,
    /// Beneficiary's age in the year the account was inherited.
    pub beneficiary_age: Option<u32>,
    /// Whether the original owner had already begun mandatory distributions.
    /// When true, an annual single-life minimum applies under every strategy.
    pub owner_rmd_started: bool,
}

/// Complete financial profile for one calculation request. Constructed by the
/// caller, never mutated by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    /// Calendar year corresponding to `current_age`.
    pub plan_start_year: i32,

    pub pre_tax_balance: f64,
    pub roth_balance: f64,
    pub after_tax_balance: f64,
    pub hsa_balance: f64,
    pub dividend_balance: f64,
    pub crypto_balance: f64,

    pub pre_tax_contribution: f64,
    pub roth_contribution: f64,
    pub after_tax_contribution: f64,
    pub hsa_contribution: f64,
    pub employer_match: f64,
    pub contribution_growth_rate: f64,

    pub pre_retirement_return: f64,
    pub post_retirement_return: f64,
    /// Annual return volatility used by the Monte Carlo engine.
    pub standard_deviation: f64,

    pub inflation_rate: f64,
    pub expense_growth_rate: f64,
    pub healthcare_inflation: f64,
    pub annual_expenses: f64,
    pub annual_healthcare_expenses: f64,

    pub social_security: Option<GuaranteedIncome>,
    pub spouse_social_security: Option<GuaranteedIncome>,
    pub pension: Option<GuaranteedIncome>,
    pub additional_income: Vec<IncomeSource>,

    pub rmd_enabled: bool,
    pub rmd_start_age: u32,

    pub inherited: Option<InheritedAccount>,

    pub monte_carlo_runs: u32,
    pub seed: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            current_age: 30,
            retirement_age: 65,
            life_expectancy: 90,
            plan_start_year: 2025,
            pre_tax_balance: 0.0,
            roth_balance: 0.0,
            after_tax_balance: 0.0,
            hsa_balance: 0.0,
            dividend_balance: 0.0,
            crypto_balance: 0.0,
            pre_tax_contribution: 0.0,
            roth_contribution: 0.0,
            after_tax_contribution: 0.0,
            hsa_contribution: 0.0,
            employer_match: 0.0,
            contribution_growth_rate: 0.0,
            pre_retirement_return: 0.07,
            post_retirement_return: 0.05,
            standard_deviation: 0.12,
            inflation_rate: 0.025,
            expense_growth_rate: 0.025,
            healthcare_inflation: 0.05,
            annual_expenses: 0.0,
            annual_healthcare_expenses: 0.0,
            social_security: None,
            spouse_social_security: None,
            pension: None,
            additional_income: Vec::new(),
            rmd_enabled: true,
            rmd_start_age: 73,
            inherited: None,
            monte_carlo_runs: 1_000,
            seed: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("invalid profile: {field}: {reason}")]
    InvalidProfile {
        field: &'static str,
        reason: &'static str,
    },
}

impl Profile {
    /// Structural validation performed before any computation. Numeric edge
    /// cases inside the projection are handled by clamping instead.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.retirement_age <= self.current_age {
            return Err(ProfileError::InvalidProfile {
                field: "retirementAge",
                reason: "must be greater than currentAge",
            });
        }
        if self.life_expectancy <= self.retirement_age {
            return Err(ProfileError::InvalidProfile {
                field: "lifeExpectancy",
                reason: "must be greater than retirementAge",
            });
        }
        Ok(())
    }

    pub(crate) fn validate_for_monte_carlo(&self) -> Result<(), ProfileError> {
        self.validate()?;
        if self.monte_carlo_runs == 0 {
            return Err(ProfileError::InvalidProfile {
                field: "monteCarloRuns",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

/// Per-category investment growth applied in one simulated year.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthBreakdown {
    pub pre_tax: f64,
    pub roth: f64,
    pub after_tax: f64,
    pub hsa: f64,
    pub dividend: f64,
    pub crypto: f64,
    pub inherited: f64,
}

impl GrowthBreakdown {
    pub fn total(&self) -> f64 {
        self.pre_tax
            + self.roth
            + self.after_tax
            + self.hsa
            + self.dividend
            + self.crypto
            + self.inherited
    }
}

/// One simulated year of the projection ledger.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub age: u32,
    pub year: i32,
    pub phase: Phase,
    pub starting_balance: f64,
    pub growth: GrowthBreakdown,
    pub social_security: f64,
    pub spouse_social_security: f64,
    pub pension: f64,
    pub other_income: f64,
    pub rmd: f64,
    pub inherited_distribution: f64,
    pub total_income: f64,
    pub expenses: f64,
    pub withdrawal: f64,
    pub ending_balance: f64,
}

/// Deterministic projection under one fixed return adjustment.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub return_adjustment: f64,
    pub balance_at_retirement: f64,
    pub final_balance: f64,
    pub years_money_lasts: u32,
    pub years: Vec<YearRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResults {
    pub expected: ScenarioOutcome,
    pub optimistic: ScenarioOutcome,
    pub pessimistic: ScenarioOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub runs: u32,
    /// Percentage of runs that never exhausted funds before life expectancy.
    pub success_rate: f64,
    pub mean_final_balance: f64,
    pub min_final_balance: f64,
    pub max_final_balance: f64,
    pub percentile10: f64,
    pub percentile25: f64,
    pub median: f64,
    pub percentile75: f64,
    pub percentile90: f64,
    pub warnings: Vec<String>,
}

/// Progress report handed to the batch callback between Monte Carlo batches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloProgress {
    pub completed: u32,
    pub total: u32,
}
