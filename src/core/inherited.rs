//! Withdrawal policy for inherited tax-deferred accounts under the 10-year
//! depletion rule. Every strategy must empty the account by the 10th year
//! after inheritance; no strategy may withdraw a negative amount or more than
//! the current balance.

use super::tables::single_life_factor;
use super::types::InheritedStrategy;

/// Years in the final stretch where `BackLoaded` starts spreading.
const BACK_LOADED_WINDOW: i32 = 3;

/// Mandatory/optional withdrawal for an inherited account in `current_year`.
///
/// `beneficiary_age` is the beneficiary's age in the year of inheritance; the
/// single-life factor looked up for that age is reduced by one for each year
/// elapsed since, floored at 1. When `owner_rmd_started` is set, that annual
/// single-life minimum applies under every strategy.
pub fn inherited_withdrawal(
    balance: f64,
    current_year: i32,
    year_inherited: i32,
    strategy: InheritedStrategy,
    beneficiary_age: Option<u32>,
    owner_rmd_started: bool,
) -> f64 {
    if balance <= 0.0 {
        return 0.0;
    }

    let years_elapsed = current_year - year_inherited;
    let years_remaining = 10 - years_elapsed;
    if years_remaining <= 0 {
        return balance;
    }

    let chosen = match strategy {
        InheritedStrategy::AnnualRmd => {
            single_life_withdrawal(balance, years_elapsed, years_remaining, beneficiary_age)
        }
        // Nothing until the forced-depletion year empties the account.
        InheritedStrategy::Year10LumpSum => 0.0,
        InheritedStrategy::BackLoaded => {
            if years_remaining > BACK_LOADED_WINDOW {
                0.0
            } else {
                spread_evenly(balance, years_remaining)
            }
        }
        InheritedStrategy::SpreadEvenly => spread_evenly(balance, years_remaining),
    };

    let floor = if owner_rmd_started {
        single_life_withdrawal(balance, years_elapsed, years_remaining, beneficiary_age)
    } else {
        0.0
    };

    chosen.max(floor).clamp(0.0, balance)
}

fn spread_evenly(balance: f64, years_remaining: i32) -> f64 {
    balance / years_remaining.max(1) as f64
}

fn single_life_withdrawal(
    balance: f64,
    years_elapsed: i32,
    years_remaining: i32,
    beneficiary_age: Option<u32>,
) -> f64 {
    if years_remaining == 1 {
        return balance;
    }
    let Some(age) = beneficiary_age else {
        return spread_evenly(balance, years_remaining);
    };
    let factor = (single_life_factor(age) - years_elapsed.max(0) as f64).max(1.0);
    balance / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tables::single_life_factor;

    const EPS: f64 = 1e-9;

    fn withdraw(
        balance: f64,
        elapsed: i32,
        strategy: InheritedStrategy,
        beneficiary_age: Option<u32>,
        owner_rmd_started: bool,
    ) -> f64 {
        inherited_withdrawal(
            balance,
            2020 + elapsed,
            2020,
            strategy,
            beneficiary_age,
            owner_rmd_started,
        )
    }

    #[test]
    fn lump_sum_withdraws_nothing_until_year_ten() {
        for elapsed in 1..=9 {
            let w = withdraw(100_000.0, elapsed, InheritedStrategy::Year10LumpSum, None, false);
            assert_eq!(w, 0.0, "year {elapsed} should withdraw nothing");
        }
        let year_ten = withdraw(100_000.0, 10, InheritedStrategy::Year10LumpSum, None, false);
        assert!((year_ten - 100_000.0).abs() <= EPS);
    }

    #[test]
    fn spread_evenly_divides_by_years_remaining() {
        // 4 years elapsed leaves 6 remaining.
        let w = withdraw(60_000.0, 4, InheritedStrategy::SpreadEvenly, None, false);
        assert!((w - 10_000.0).abs() <= EPS, "got {w}");
    }

    #[test]
    fn back_loaded_waits_then_spreads() {
        assert_eq!(
            withdraw(90_000.0, 3, InheritedStrategy::BackLoaded, None, false),
            0.0
        );
        // 7 years elapsed leaves 3 remaining: spread over 3.
        let w = withdraw(90_000.0, 7, InheritedStrategy::BackLoaded, None, false);
        assert!((w - 30_000.0).abs() <= EPS, "got {w}");
    }

    #[test]
    fn annual_rmd_uses_reduced_single_life_factor() {
        let balance = 100_000.0;
        let elapsed = 3;
        let w = withdraw(balance, elapsed, InheritedStrategy::AnnualRmd, Some(40), false);
        let expected = balance / (single_life_factor(40) - elapsed as f64);
        assert!((w - expected).abs() <= EPS, "got {w}, expected {expected}");
    }

    #[test]
    fn annual_rmd_without_beneficiary_age_falls_back_to_even_spread() {
        let w = withdraw(50_000.0, 5, InheritedStrategy::AnnualRmd, None, false);
        assert!((w - 10_000.0).abs() <= EPS, "got {w}");
    }

    #[test]
    fn annual_rmd_empties_the_account_in_the_final_year() {
        let w = withdraw(42_000.0, 9, InheritedStrategy::AnnualRmd, Some(40), false);
        assert!((w - 42_000.0).abs() <= EPS);
    }

    #[test]
    fn forced_depletion_after_ten_years() {
        for elapsed in [10, 11, 15] {
            let w = withdraw(25_000.0, elapsed, InheritedStrategy::Year10LumpSum, None, false);
            assert!((w - 25_000.0).abs() <= EPS, "elapsed {elapsed}: got {w}");
        }
    }

    #[test]
    fn owner_rmd_started_floors_every_strategy() {
        let balance = 100_000.0;
        let elapsed = 2;
        let minimum = balance / (single_life_factor(45) - elapsed as f64);
        for strategy in [
            InheritedStrategy::Year10LumpSum,
            InheritedStrategy::BackLoaded,
            InheritedStrategy::SpreadEvenly,
            InheritedStrategy::AnnualRmd,
        ] {
            let w = withdraw(balance, elapsed, strategy, Some(45), true);
            assert!(
                w >= minimum - EPS,
                "{strategy:?} ignored the annual minimum: {w} < {minimum}"
            );
        }
    }

    #[test]
    fn withdrawal_never_exceeds_balance_or_goes_negative() {
        for strategy in [
            InheritedStrategy::AnnualRmd,
            InheritedStrategy::Year10LumpSum,
            InheritedStrategy::BackLoaded,
            InheritedStrategy::SpreadEvenly,
        ] {
            for elapsed in 0..=12 {
                for balance in [0.0, 1.0, 12_345.67, 1_000_000.0] {
                    let w = withdraw(balance, elapsed, strategy, Some(30), true);
                    assert!(w >= 0.0, "{strategy:?} negative withdrawal");
                    assert!(w <= balance + EPS, "{strategy:?} overdrew: {w} > {balance}");
                }
            }
        }
    }

    #[test]
    fn spread_evenly_depletes_exactly_over_ten_years_without_growth() {
        let mut balance = 100_000.0_f64;
        let mut withdrawn = 0.0;
        for year in 2021..=2030 {
            let w = inherited_withdrawal(
                balance,
                year,
                2020,
                InheritedStrategy::SpreadEvenly,
                None,
                false,
            );
            withdrawn += w;
            balance -= w;
        }
        assert!((withdrawn - 100_000.0).abs() <= 1e-6);
        assert!(balance.abs() <= 1e-6, "account not emptied: {balance}");
    }

    #[test]
    fn spread_evenly_empties_exactly_with_interim_growth() {
        // The caller applies growth before asking for the withdrawal, so the
        // final withdrawal must take the grown balance with it.
        let mut balance = 100_000.0_f64;
        let mut withdrawn = 0.0;
        for year in 2021..=2030 {
            balance *= 1.05;
            let w = inherited_withdrawal(
                balance,
                year,
                2020,
                InheritedStrategy::SpreadEvenly,
                None,
                false,
            );
            withdrawn += w;
            balance -= w;
        }
        assert!(balance.abs() <= 1e-6, "account not emptied: {balance}");
        assert!(withdrawn > 100_000.0, "interim growth not withdrawn");
    }
}
