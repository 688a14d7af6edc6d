// =============================================================================
// Sentiment Calculator: Put/Call Ratio and Max Pain
// =============================================================================
//
// Two set-wide aggregates over the option-chain table:
//
//   PCR      = round(sum(PE_OI) / sum(CE_OI), 2)
//   Max Pain = strike with the smallest CE_OI + PE_OI
//
// Max pain here is the open-interest-sum proxy, not the writer-loss
// formulation.  Ties go to the first row in input order.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, PulseResult};
use crate::types::OptionChainRow;

/// Both metrics for one option-chain snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Put/Call open-interest ratio, two decimals.
    pub pcr: f64,
    pub max_pain_strike: f64,
}

/// Aggregate put OI over aggregate call OI, rounded to two decimals.
pub fn compute_pcr(rows: &[OptionChainRow]) -> PulseResult<f64> {
    if rows.is_empty() {
        return Err(PulseError::invalid_input("cannot compute PCR on an empty option chain"));
    }

    let total_ce: i64 = rows.iter().map(|r| r.ce_oi).sum();
    let total_pe: i64 = rows.iter().map(|r| r.pe_oi).sum();

    if total_ce <= 0 {
        return Err(PulseError::invalid_input(format!(
            "total call open interest is {total_ce}; PCR undefined"
        )));
    }

    let ratio = total_pe as f64 / total_ce as f64;
    // Half-way cases go to the even cent: 1/8 reports 0.12.
    Ok((ratio * 100.0).round_ties_even() / 100.0)
}

/// Strike whose combined call + put open interest is smallest.
pub fn compute_max_pain(rows: &[OptionChainRow]) -> PulseResult<f64> {
    let mut best: Option<(&OptionChainRow, i64)> = None;

    for row in rows {
        let pain = row.ce_oi + row.pe_oi;
        match best {
            Some((_, lowest)) if pain >= lowest => {}
            _ => best = Some((row, pain)),
        }
    }

    best.map(|(row, _)| row.strike_price)
        .ok_or_else(|| PulseError::invalid_input("cannot compute max pain on an empty option chain"))
}

/// Compute both metrics; the first failing precondition wins.
pub fn summarize(rows: &[OptionChainRow]) -> PulseResult<SentimentSummary> {
    Ok(SentimentSummary {
        pcr: compute_pcr(rows)?,
        max_pain_strike: compute_max_pain(rows)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn rows(strikes: &[(f64, i64, i64)]) -> Vec<OptionChainRow> {
        strikes
            .iter()
            .map(|&(strike, ce, pe)| OptionChainRow::new(strike, ce, pe))
            .collect()
    }

    // ---- compute_pcr -----------------------------------------------------

    #[test]
    fn pcr_balanced_book_is_one() {
        let table = rows(&[(100.0, 500, 300), (200.0, 400, 600)]);
        assert!((compute_pcr(&table).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn pcr_rounds_to_two_decimals() {
        // 1000 / 3000 = 0.3333...
        let table = rows(&[(100.0, 3000, 1000)]);
        assert!((compute_pcr(&table).unwrap() - 0.33).abs() < 1e-10);

        // 2000 / 3000 = 0.6666...
        let table = rows(&[(100.0, 3000, 2000)]);
        assert!((compute_pcr(&table).unwrap() - 0.67).abs() < 1e-10);
    }

    #[test]
    fn pcr_half_cent_rounds_to_even() {
        // 1 / 8 = 0.125
        let table = rows(&[(100.0, 8, 1)]);
        assert!((compute_pcr(&table).unwrap() - 0.12).abs() < 1e-10);

        // 9 / 8 = 1.125
        let table = rows(&[(100.0, 8, 9)]);
        assert!((compute_pcr(&table).unwrap() - 1.12).abs() < 1e-10);

        // 3 / 8 = 0.375
        let table = rows(&[(100.0, 8, 3)]);
        assert!((compute_pcr(&table).unwrap() - 0.38).abs() < 1e-10);
    }

    #[test]
    fn pcr_empty_table_is_invalid_input() {
        let err = compute_pcr(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn pcr_zero_call_oi_is_invalid_input() {
        let table = rows(&[(100.0, 0, 250), (200.0, 0, 10)]);
        let err = compute_pcr(&table).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    // ---- compute_max_pain ------------------------------------------------

    #[test]
    fn max_pain_picks_lowest_combined_oi() {
        let table = rows(&[(100.0, 500, 300), (200.0, 100, 100), (300.0, 400, 600)]);
        assert_eq!(compute_max_pain(&table).unwrap(), 200.0);
    }

    #[test]
    fn max_pain_tie_goes_to_first_row() {
        let table = rows(&[(100.0, 100, 100), (200.0, 50, 150)]);
        for _ in 0..10 {
            assert_eq!(compute_max_pain(&table).unwrap(), 100.0);
        }
    }

    #[test]
    fn max_pain_order_matters_only_for_ties() {
        let table = rows(&[(300.0, 400, 600), (200.0, 100, 100), (100.0, 500, 300)]);
        assert_eq!(compute_max_pain(&table).unwrap(), 200.0);
    }

    #[test]
    fn max_pain_duplicate_strikes_compete_independently() {
        let table = rows(&[(100.0, 900, 900), (200.0, 50, 50), (100.0, 10, 10)]);
        assert_eq!(compute_max_pain(&table).unwrap(), 100.0);
    }

    #[test]
    fn max_pain_empty_table_is_invalid_input() {
        let err = compute_max_pain(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    // ---- summarize -------------------------------------------------------

    #[test]
    fn summarize_reports_both_metrics() {
        let table = rows(&[(100.0, 500, 300), (200.0, 100, 100), (300.0, 400, 600)]);
        let summary = summarize(&table).unwrap();
        assert!((summary.pcr - 1.0).abs() < 1e-10);
        assert_eq!(summary.max_pain_strike, 200.0);
    }

    #[test]
    fn summarize_surfaces_pcr_failure() {
        let table = rows(&[(100.0, 0, 0)]);
        assert_eq!(summarize(&table).unwrap_err().kind(), ErrorKind::InvalidInput);
    }
}
