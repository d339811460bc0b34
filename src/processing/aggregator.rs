//! Result Aggregation Module
//!
//! Collects per-chunk delays in any order and reduces them into summary
//! statistics, each flagged against a one-frame tolerance.

use std::collections::HashMap;
use std::fmt;
use crate::error::{AlignerError, Result};
use super::aligner::DelayResult;
use super::pool::ChunkOutcome;

/// Whether a delay is perceptible at the reference frame rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceStatus {
    Within,
    Exceeds,
}

impl ToleranceStatus {
    pub fn classify(delay_ms: i64, tolerance_ms: f64) -> Self {
        if delay_ms.unsigned_abs() as f64 > tolerance_ms {
            ToleranceStatus::Exceeds
        } else {
            ToleranceStatus::Within
        }
    }

}

impl fmt::Display for ToleranceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToleranceStatus::Within => write!(f, "within tolerance"),
            ToleranceStatus::Exceeds => write!(f, "exceeds tolerance"),
        }
    }
}

/// One rendered report line
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub label: String,
    pub delay_ms: i64,
    pub status: ToleranceStatus,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}ms ({})", self.label, self.delay_ms, self.status)
    }
}

/// `hh:mm:ss` start time of a chunk, truncated to whole seconds
pub fn format_timestamp(chunk_idx: usize, chunk_duration: f64) -> String {
    let total = (chunk_idx as f64 * chunk_duration) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Accumulates chunk outcomes as they arrive
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<DelayResult>,
    failures: Vec<usize>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: &ChunkOutcome) {
        match &outcome.result {
            Ok(result) => self.results.push(*result),
            Err(_) => self.failures.push(outcome.chunk_idx),
        }
    }

    pub fn success_count(&self) -> usize {
        self.results.len()
    }

    /// Indices of failed chunks, ascending
    pub fn failed_chunks(&self) -> Vec<usize> {
        let mut failed = self.failures.clone();
        failed.sort_unstable();
        failed
    }

    pub fn finish(self, tolerance_ms: f64) -> Result<AlignmentSummary> {
        AlignmentSummary::from_results(self.results, tolerance_ms)
    }
}

/// Per-chunk delays ordered by chunk index plus summary statistics
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentSummary {
    pub delays: Vec<DelayResult>,
    /// Most frequent delay, earliest chunk wins ties
    pub mode_ms: i64,
    /// Mean truncated toward zero
    pub mean_ms: i64,
    /// Delay closest to zero
    pub min_abs_ms: i64,
    /// Delay farthest from zero
    pub max_abs_ms: i64,
    /// One reference frame in milliseconds
    pub tolerance_ms: f64,
}

impl AlignmentSummary {
    pub fn from_results<I>(results: I, tolerance_ms: f64) -> Result<Self>
    where
        I: IntoIterator<Item = DelayResult>,
    {
        let mut delays: Vec<DelayResult> = results.into_iter().collect();
        if delays.is_empty() {
            return Err(AlignerError::NoValidResults);
        }
        delays.sort_by_key(|d| d.chunk_idx);

        let values: Vec<i64> = delays.iter().map(|d| d.delay_ms).collect();

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for &v in &values {
            *counts.entry(v).or_default() += 1;
        }
        let mut mode_ms = values[0];
        for &v in &values {
            if counts[&v] > counts[&mode_ms] {
                mode_ms = v;
            }
        }

        let mean_ms = values.iter().sum::<i64>() / values.len() as i64;

        let mut min_abs_ms = values[0];
        let mut max_abs_ms = values[0];
        for &v in &values[1..] {
            if v.unsigned_abs() < min_abs_ms.unsigned_abs() {
                min_abs_ms = v;
            }
            if v.unsigned_abs() > max_abs_ms.unsigned_abs() {
                max_abs_ms = v;
            }
        }

        Ok(Self { delays, mode_ms, mean_ms, min_abs_ms, max_abs_ms, tolerance_ms })
    }

    pub fn status(&self, delay_ms: i64) -> ToleranceStatus {
        ToleranceStatus::classify(delay_ms, self.tolerance_ms)
    }

    /// One line per successful chunk, labelled with its start time
    pub fn chunk_lines(&self, chunk_duration: f64) -> Vec<ReportLine> {
        self.delays
            .iter()
            .map(|d| ReportLine {
                label: format!("[{}]", format_timestamp(d.chunk_idx, chunk_duration)),
                delay_ms: d.delay_ms,
                status: self.status(d.delay_ms),
            })
            .collect()
    }

    /// Mode, average, minimum and maximum lines
    pub fn summary_lines(&self) -> Vec<ReportLine> {
        [
            ("Mode delay:", self.mode_ms),
            ("Average delay:", self.mean_ms),
            ("Minimum delay:", self.min_abs_ms),
            ("Maximum delay:", self.max_abs_ms),
        ]
        .into_iter()
        .map(|(label, delay_ms)| ReportLine {
            label: label.to_string(),
            delay_ms,
            status: self.status(delay_ms),
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(delays: &[(usize, i64)]) -> Vec<DelayResult> {
        delays.iter().map(|&(chunk_idx, delay_ms)| DelayResult { chunk_idx, delay_ms }).collect()
    }

    #[test]
    fn test_summary_statistics() {
        let summary = AlignmentSummary::from_results(results(&[(2, 200), (0, 100), (1, 100)]), 41.7).unwrap();

        assert_eq!(summary.delays.iter().map(|d| d.chunk_idx).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(summary.mode_ms, 100);
        assert_eq!(summary.mean_ms, 133);
        assert_eq!(summary.min_abs_ms, 100);
        assert_eq!(summary.max_abs_ms, 200);
    }

    #[test]
    fn test_order_independence() {
        let a = AlignmentSummary::from_results(results(&[(0, -5), (1, 12), (2, 12), (3, -40)]), 40.0).unwrap();
        let b = AlignmentSummary::from_results(results(&[(3, -40), (2, 12), (0, -5), (1, 12)]), 40.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_magnitude_extremes_keep_sign() {
        let summary = AlignmentSummary::from_results(results(&[(0, 30), (1, -3), (2, -90), (3, 50)]), 41.7).unwrap();
        assert_eq!(summary.min_abs_ms, -3);
        assert_eq!(summary.max_abs_ms, -90);
    }

    #[test]
    fn test_mean_truncates_toward_zero() {
        let summary = AlignmentSummary::from_results(results(&[(0, -100), (1, -100), (2, -201)]), 41.7).unwrap();
        // -401 / 3 = -133.67
        assert_eq!(summary.mean_ms, -133);
    }

    #[test]
    fn test_mode_tie_prefers_earliest_chunk() {
        let summary = AlignmentSummary::from_results(results(&[(3, 7), (0, 9), (1, 7), (2, 9)]), 41.7).unwrap();
        assert_eq!(summary.mode_ms, 9);
    }

    #[test]
    fn test_magnitude_tie_prefers_earliest_chunk() {
        let summary = AlignmentSummary::from_results(results(&[(0, 10), (1, -10)]), 41.7).unwrap();
        assert_eq!(summary.min_abs_ms, 10);
        assert_eq!(summary.max_abs_ms, 10);
    }

    #[test]
    fn test_no_results() {
        let err = AlignmentSummary::from_results(Vec::new(), 41.7).unwrap_err();
        assert!(matches!(err, AlignerError::NoValidResults));
        assert!(ResultAggregator::new().finish(41.7).is_err());
    }

    #[test]
    fn test_tolerance_flags() {
        let tolerance = 1000.0 / 24.0;
        assert_eq!(ToleranceStatus::classify(30, tolerance), ToleranceStatus::Within);
        assert_eq!(ToleranceStatus::classify(-41, tolerance), ToleranceStatus::Within);
        assert_eq!(ToleranceStatus::classify(50, tolerance), ToleranceStatus::Exceeds);
        assert_eq!(ToleranceStatus::classify(-42, tolerance), ToleranceStatus::Exceeds);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0, 300.0), "00:00:00");
        assert_eq!(format_timestamp(1, 300.0), "00:05:00");
        assert_eq!(format_timestamp(13, 300.0), "01:05:00");
        assert_eq!(format_timestamp(3, 2.5), "00:00:07");
    }

    #[test]
    fn test_report_lines() {
        let summary = AlignmentSummary::from_results(results(&[(1, 50), (0, 30)]), 1000.0 / 24.0).unwrap();

        let chunks = summary.chunk_lines(300.0);
        assert_eq!(chunks[0].to_string(), "[00:00:00] 30ms (within tolerance)");
        assert_eq!(chunks[1].to_string(), "[00:05:00] 50ms (exceeds tolerance)");

        let lines = summary.summary_lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].to_string(), "Mode delay: 30ms (within tolerance)");
        assert_eq!(lines[1].to_string(), "Average delay: 40ms (within tolerance)");
        assert_eq!(lines[3].label, "Maximum delay:");
        assert_eq!(lines[3].status, ToleranceStatus::Exceeds);
    }

    #[test]
    fn test_aggregator_collects_failures() {
        let mut aggregator = ResultAggregator::new();
        for (idx, result) in [
            (2, Ok(DelayResult { chunk_idx: 2, delay_ms: 4 })),
            (0, Err(AlignerError::chunk(0, "flat"))),
            (1, Ok(DelayResult { chunk_idx: 1, delay_ms: 4 })),
        ] {
            aggregator.push(&ChunkOutcome { chunk_idx: idx, worker: 0, result, time_ms: 0 });
        }

        assert_eq!(aggregator.success_count(), 2);
        assert_eq!(aggregator.failed_chunks(), vec![0]);
        let summary = aggregator.finish(41.7).unwrap();
        assert_eq!(summary.delays.len(), 2);
        assert_eq!(summary.mode_ms, 4);
    }
}
