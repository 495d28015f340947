//! Projection engines. A single `advance_year` function drives both the
//! deterministic scenario engine and the stochastic Monte Carlo engine; the
//! only difference between them is the injected `ReturnModel`.

use super::inherited::inherited_withdrawal;
use super::sampler::{FixedReturn, ReturnModel, RngSource, SampledReturn, derive_run_seed};
use super::tables::required_minimum_distribution;
use super::types::{
    GrowthBreakdown, GuaranteedIncome, MonteCarloProgress, MonteCarloResult, Phase, Profile,
    ProfileError, ScenarioOutcome, ScenarioResults, YearRecord,
};

/// Age at which healthcare costs switch from the healthcare inflation rate to
/// general inflation (Medicare eligibility).
const MEDICARE_AGE: u32 = 65;

/// Return adjustment applied for the optimistic/pessimistic scenarios.
const SCENARIO_SPREAD: f64 = 0.02;

/// Cap on the simplified "years the money lasts" decay loop.
const DECAY_YEARS_CAP: u32 = 100;

/// Default number of runs between progress callbacks.
pub const DEFAULT_BATCH_SIZE: u32 = 250;

#[derive(Clone, Copy, Debug, Default)]
struct Accounts {
    pre_tax: f64,
    roth: f64,
    after_tax: f64,
    hsa: f64,
    dividend: f64,
    crypto: f64,
    inherited: f64,
}

impl Accounts {
    fn from_profile(profile: &Profile) -> Self {
        Self {
            pre_tax: profile.pre_tax_balance.max(0.0),
            roth: profile.roth_balance.max(0.0),
            after_tax: profile.after_tax_balance.max(0.0),
            hsa: profile.hsa_balance.max(0.0),
            dividend: profile.dividend_balance.max(0.0),
            crypto: profile.crypto_balance.max(0.0),
            inherited: profile
                .inherited
                .as_ref()
                .map(|i| i.balance.max(0.0))
                .unwrap_or(0.0),
        }
    }

    fn total(&self) -> f64 {
        self.pre_tax
            + self.roth
            + self.after_tax
            + self.hsa
            + self.dividend
            + self.crypto
            + self.inherited
    }
}

#[derive(Clone, Copy, Debug)]
struct ContributionStreams {
    pre_tax: f64,
    roth: f64,
    after_tax: f64,
    hsa: f64,
    employer_match: f64,
}

impl ContributionStreams {
    fn from_profile(profile: &Profile) -> Self {
        Self {
            pre_tax: profile.pre_tax_contribution.max(0.0),
            roth: profile.roth_contribution.max(0.0),
            after_tax: profile.after_tax_contribution.max(0.0),
            hsa: profile.hsa_contribution.max(0.0),
            employer_match: profile.employer_match.max(0.0),
        }
    }

    fn grow(&mut self, rate: f64) {
        let factor = 1.0 + rate;
        self.pre_tax *= factor;
        self.roth *= factor;
        self.after_tax *= factor;
        self.hsa *= factor;
        self.employer_match *= factor;
    }
}

struct SimState {
    accounts: Accounts,
    contributions: ContributionStreams,
}

impl SimState {
    fn new(profile: &Profile) -> Self {
        Self {
            accounts: Accounts::from_profile(profile),
            contributions: ContributionStreams::from_profile(profile),
        }
    }
}

fn phase_for(profile: &Profile, age: u32) -> Phase {
    if age < profile.retirement_age {
        Phase::Accumulating
    } else {
        Phase::Distributing
    }
}

fn compound(rate: f64, years: u32) -> f64 {
    (1.0 + rate).powi(years as i32)
}

fn guaranteed_income_at(income: Option<&GuaranteedIncome>, age: u32) -> f64 {
    let Some(income) = income else {
        return 0.0;
    };
    if age < income.start_age || income.amount <= 0.0 {
        return 0.0;
    }
    income.amount * compound(income.cola_rate, age - income.start_age)
}

fn additional_income_at(profile: &Profile, age: u32) -> f64 {
    profile
        .additional_income
        .iter()
        .filter(|source| age >= source.start_age && age <= source.end_age)
        .map(|source| {
            let base = source.amount.max(0.0);
            if source.inflation_adjusted {
                base * compound(profile.inflation_rate, age - source.start_age)
            } else {
                base
            }
        })
        .sum()
}

/// Age- and inflation-compounded annual expenses. Healthcare compounds at the
/// healthcare inflation rate until the Medicare age, after which the age-65
/// level compounds at general inflation.
fn expenses_at(profile: &Profile, age: u32) -> f64 {
    let years_since_start = age.saturating_sub(profile.current_age);
    let base = profile.annual_expenses.max(0.0) * compound(profile.expense_growth_rate, years_since_start);

    let healthcare_base = profile.annual_healthcare_expenses.max(0.0);
    let healthcare = if age < MEDICARE_AGE {
        healthcare_base * compound(profile.healthcare_inflation, years_since_start)
    } else {
        let pre_medicare_years = MEDICARE_AGE.saturating_sub(profile.current_age);
        let at_medicare = healthcare_base * compound(profile.healthcare_inflation, pre_medicare_years);
        let medicare_years = age - MEDICARE_AGE.max(profile.current_age);
        at_medicare * compound(profile.inflation_rate, medicare_years)
    };

    base + healthcare
}

/// Advances the simulation by one year and emits the ledger record. Shared by
/// the deterministic and stochastic engines; `annual_return` is whatever the
/// injected `ReturnModel` produced for this year.
fn advance_year(profile: &Profile, state: &mut SimState, age: u32, annual_return: f64) -> YearRecord {
    let phase = phase_for(profile, age);
    let year = profile.plan_start_year + (age - profile.current_age) as i32;
    let accounts = state.accounts;
    let starting_balance = accounts.total();

    // The pre-tax mandatory distribution is computed on the start-of-year
    // balance.
    let rmd = if profile.rmd_enabled {
        required_minimum_distribution(age, accounts.pre_tax, profile.rmd_start_age)
    } else {
        0.0
    };

    let social_security = guaranteed_income_at(profile.social_security.as_ref(), age);
    let spouse_social_security =
        guaranteed_income_at(profile.spouse_social_security.as_ref(), age);
    let pension = guaranteed_income_at(profile.pension.as_ref(), age);
    let other_income = additional_income_at(profile, age);

    let expenses = if phase == Phase::Distributing {
        expenses_at(profile, age)
    } else {
        0.0
    };

    let growth = GrowthBreakdown {
        pre_tax: accounts.pre_tax * annual_return,
        roth: accounts.roth * annual_return,
        after_tax: accounts.after_tax * annual_return,
        hsa: accounts.hsa * annual_return,
        dividend: accounts.dividend * annual_return,
        crypto: accounts.crypto * annual_return,
        inherited: accounts.inherited * annual_return,
    };

    let mut pre_tax = accounts.pre_tax + growth.pre_tax;
    let mut roth = accounts.roth + growth.roth;
    let mut after_tax = accounts.after_tax + growth.after_tax;
    let mut hsa = accounts.hsa + growth.hsa;
    let dividend = accounts.dividend + growth.dividend;
    let crypto = accounts.crypto + growth.crypto;
    let mut inherited = accounts.inherited + growth.inherited;

    // The inherited policy sees the post-growth balance, so a depletion year
    // empties the account including that year's growth.
    let inherited_distribution = match profile.inherited.as_ref() {
        Some(inh) if inherited > 0.0 => inherited_withdrawal(
            inherited,
            year,
            inh.year_inherited,
            inh.strategy,
            inh.beneficiary_age,
            inh.owner_rmd_started,
        ),
        _ => 0.0,
    };
    let total_income = social_security
        + spouse_social_security
        + pension
        + other_income
        + rmd
        + inherited_distribution;

    // Mandatory distributions come out first: pre-tax, then inherited.
    let rmd_taken = rmd.min(pre_tax.max(0.0));
    pre_tax -= rmd_taken;
    let inherited_taken = inherited_distribution.min(inherited.max(0.0));
    inherited -= inherited_taken;
    let mut withdrawal = rmd_taken + inherited_taken;

    match phase {
        Phase::Accumulating => {
            pre_tax += state.contributions.pre_tax + state.contributions.employer_match;
            roth += state.contributions.roth;
            after_tax += state.contributions.after_tax;
            hsa += state.contributions.hsa;
        }
        Phase::Distributing => {
            // Any shortfall beyond guaranteed income and mandatory
            // distributions is drawn pre-tax, then after-tax, then Roth.
            let mut shortfall = (expenses - total_income).max(0.0);
            for balance in [&mut pre_tax, &mut after_tax, &mut roth] {
                if shortfall <= 0.0 {
                    break;
                }
                let taken = shortfall.min(balance.max(0.0));
                *balance -= taken;
                withdrawal += taken;
                shortfall -= taken;
            }
        }
    }

    state.accounts = Accounts {
        pre_tax: pre_tax.max(0.0),
        roth: roth.max(0.0),
        after_tax: after_tax.max(0.0),
        hsa: hsa.max(0.0),
        dividend: dividend.max(0.0),
        crypto: crypto.max(0.0),
        inherited: inherited.max(0.0),
    };

    YearRecord {
        age,
        year,
        phase,
        starting_balance,
        growth,
        social_security,
        spouse_social_security,
        pension,
        other_income,
        rmd: rmd_taken,
        inherited_distribution: inherited_taken,
        total_income,
        expenses,
        withdrawal,
        ending_balance: state.accounts.total(),
    }
}

/// Full deterministic ledger from current age through life expectancy,
/// terminating early if the plan depletes during the distribution phase.
fn run_projection(profile: &Profile, model: &mut impl ReturnModel) -> Vec<YearRecord> {
    let mut state = SimState::new(profile);
    let horizon = (profile.life_expectancy - profile.current_age + 1) as usize;
    let mut records = Vec::with_capacity(horizon);

    for age in profile.current_age..=profile.life_expectancy {
        let phase = phase_for(profile, age);
        let annual_return = model.annual_return(phase);
        let record = advance_year(profile, &mut state, age, annual_return);
        let depleted = phase == Phase::Distributing && record.ending_balance <= 0.0;
        records.push(record);
        if phase == Phase::Accumulating {
            state.contributions.grow(profile.contribution_growth_rate);
        }
        if depleted {
            break;
        }
    }

    records
}

/// Approximate number of years the retirement balance lasts under a
/// simplified decay: the balance compounds at the adjusted post-retirement
/// return while an inflation-growing net withdrawal need is taken each year.
fn years_money_lasts(profile: &Profile, adjustment: f64, starting_balance: f64) -> u32 {
    let rate = profile.post_retirement_return + adjustment;
    let guaranteed = [
        profile.social_security.as_ref(),
        profile.spouse_social_security.as_ref(),
        profile.pension.as_ref(),
    ]
    .into_iter()
    .flatten()
    .filter(|income| income.start_age <= profile.retirement_age)
    .map(|income| income.amount.max(0.0))
    .sum::<f64>();

    let mut need =
        (profile.annual_expenses + profile.annual_healthcare_expenses - guaranteed).max(0.0);
    if need <= 0.0 || starting_balance <= 0.0 {
        return if starting_balance > 0.0 {
            DECAY_YEARS_CAP
        } else {
            0
        };
    }

    let mut balance = starting_balance;
    let mut years = 0;
    while balance > 0.0 && years < DECAY_YEARS_CAP {
        balance = balance * (1.0 + rate) - need;
        need *= 1.0 + profile.inflation_rate;
        years += 1;
    }
    years
}

fn scenario_outcome(profile: &Profile, adjustment: f64) -> ScenarioOutcome {
    let mut model = FixedReturn::from_profile(profile, adjustment);
    let years = run_projection(profile, &mut model);

    let balance_at_retirement = years
        .iter()
        .find(|record| record.age == profile.retirement_age)
        .map(|record| record.starting_balance)
        .unwrap_or(0.0);
    let final_balance = years.last().map(|record| record.ending_balance).unwrap_or(0.0);

    ScenarioOutcome {
        return_adjustment: adjustment,
        balance_at_retirement,
        final_balance,
        years_money_lasts: years_money_lasts(profile, adjustment, balance_at_retirement),
        years,
    }
}

/// Deterministic expected/optimistic/pessimistic projections.
pub fn compute_scenarios(profile: &Profile) -> Result<ScenarioResults, ProfileError> {
    profile.validate()?;
    Ok(ScenarioResults {
        expected: scenario_outcome(profile, 0.0),
        optimistic: scenario_outcome(profile, SCENARIO_SPREAD),
        pessimistic: scenario_outcome(profile, -SCENARIO_SPREAD),
    })
}

struct RunOutcome {
    final_balance: f64,
    failed: bool,
}

/// One Monte Carlo run: the same yearly mechanics as the deterministic
/// projection, but no ledger and an early exit on depletion.
fn simulate_run(profile: &Profile, model: &mut impl ReturnModel) -> RunOutcome {
    let mut state = SimState::new(profile);

    for age in profile.current_age..=profile.life_expectancy {
        let phase = phase_for(profile, age);
        let annual_return = model.annual_return(phase);
        let record = advance_year(profile, &mut state, age, annual_return);
        if phase == Phase::Accumulating {
            state.contributions.grow(profile.contribution_growth_rate);
        }
        if phase == Phase::Distributing && record.ending_balance <= 0.0 {
            return RunOutcome {
                final_balance: 0.0,
                failed: true,
            };
        }
    }

    RunOutcome {
        final_balance: state.accounts.total(),
        failed: false,
    }
}

/// Percentile by index into the ascending-sorted final balances:
/// `index = floor(n * p)`, clamped to the last valid index.
fn percentile_by_index(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

fn aggregate(
    finals: Vec<f64>,
    failures: u32,
    total_requested: u32,
    cancelled: bool,
) -> MonteCarloResult {
    let mut warnings = Vec::new();
    let completed = finals.len() as u32;
    if cancelled {
        warnings.push(format!(
            "simulation cancelled after {completed} of {total_requested} runs"
        ));
    }

    let mut sorted: Vec<f64> = finals.into_iter().filter(|b| b.is_finite()).collect();
    let excluded = completed - sorted.len() as u32;
    if excluded > 0 {
        warnings.push(format!(
            "{excluded} runs produced non-finite balances and were excluded from statistics"
        ));
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let success_rate = if completed > 0 {
        (completed.saturating_sub(failures)) as f64 / completed as f64 * 100.0
    } else {
        0.0
    };
    let mean = if sorted.is_empty() {
        0.0
    } else {
        sorted.iter().sum::<f64>() / sorted.len() as f64
    };

    MonteCarloResult {
        runs: completed,
        success_rate,
        mean_final_balance: mean,
        min_final_balance: sorted.first().copied().unwrap_or(0.0),
        max_final_balance: sorted.last().copied().unwrap_or(0.0),
        percentile10: percentile_by_index(&sorted, 0.10),
        percentile25: percentile_by_index(&sorted, 0.25),
        median: percentile_by_index(&sorted, 0.50),
        percentile75: percentile_by_index(&sorted, 0.75),
        percentile90: percentile_by_index(&sorted, 0.90),
        warnings,
    }
}

/// Stochastic success-probability estimate over `profile.monte_carlo_runs`
/// independent runs.
pub fn run_monte_carlo(profile: &Profile) -> Result<MonteCarloResult, ProfileError> {
    run_monte_carlo_with_progress(profile, DEFAULT_BATCH_SIZE, |_| true)
}

/// Batch entry point for interactive callers: `on_batch` is invoked between
/// batches with the completed/total counts; returning `false` cancels the
/// remaining runs and aggregates what finished so far. Runs derive their own
/// seeds from the base seed, so results are independent of batching.
pub fn run_monte_carlo_with_progress(
    profile: &Profile,
    batch_size: u32,
    mut on_batch: impl FnMut(MonteCarloProgress) -> bool,
) -> Result<MonteCarloResult, ProfileError> {
    profile.validate_for_monte_carlo()?;

    let total = profile.monte_carlo_runs;
    let batch = batch_size.max(1);
    let base_seed = profile.seed.unwrap_or_else(rand::random);

    let mut finals = Vec::with_capacity(total as usize);
    let mut failures = 0_u32;
    let mut completed = 0_u32;
    let mut cancelled = false;

    while completed < total {
        let end = (completed + batch).min(total);
        for run_index in completed..end {
            let source = RngSource::seeded(derive_run_seed(base_seed, run_index));
            let mut model = SampledReturn::from_profile(profile, source);
            let outcome = simulate_run(profile, &mut model);
            if outcome.failed {
                failures += 1;
            }
            finals.push(outcome.final_balance);
        }
        completed = end;
        if completed < total && !on_batch(MonteCarloProgress { completed, total }) {
            cancelled = true;
            break;
        }
    }

    Ok(aggregate(finals, failures, total, cancelled))
}
