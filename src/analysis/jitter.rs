//! PCR jitter measurement.
//!
//! Fits a line through the `(byte_offset, pcr_seconds)` samples of one
//! PID. The slope gives the stream bitrate; the residual of each sample
//! against the fit is its timing jitter. Alignment jitter removes the
//! slow drift component with a centered moving average, leaving the
//! packet-level placement error the ±500ns accuracy limit applies to.

use super::etr290::PCR_ACCURACY_LIMIT_NS;

/// Width of the centered moving average used for alignment jitter.
const ALIGNMENT_WINDOW: usize = 50;

/// Below this many samples the regression fits noise, not the stream.
const MEANINGFUL_SAMPLES: usize = 10;

/// Jitter measurements for one PCR-carrying PID.
#[derive(Debug, Clone, PartialEq)]
pub struct JitterAnalysis {
    pub samples: usize,
    /// Bitrate implied by the regression slope, bits per second.
    pub bitrate: f64,
    pub max_jitter_ns: f64,
    pub min_jitter_ns: f64,
    pub max_alignment_jitter_ns: f64,
    pub timing_jitter_ns: Vec<f64>,
    pub alignment_jitter_ns: Vec<f64>,
}

impl JitterAnalysis {
    /// With too few samples the numbers exist but should not be trusted
    /// or held against the accuracy limit.
    pub fn is_meaningful(&self) -> bool {
        self.samples > MEANINGFUL_SAMPLES
    }

    /// The accuracy verdict is on the raw timing residuals; alignment
    /// jitter is a report-only figure and would hide slow drift here.
    pub fn exceeds_accuracy_limit(&self) -> bool {
        self.max_jitter_ns.abs() > PCR_ACCURACY_LIMIT_NS
            || self.min_jitter_ns.abs() > PCR_ACCURACY_LIMIT_NS
    }
}

/// Runs the jitter regression over one PID's PCR samples.
///
/// Returns `None` with fewer than two samples, or when the samples are
/// degenerate (all at one offset, or time running backwards).
pub fn analyze_pcr_samples(samples: &[(u64, f64)]) -> Option<JitterAnalysis> {
    if samples.len() < 2 {
        return None;
    }

    let n = samples.len() as f64;
    let mean_x = samples.iter().map(|&(x, _)| x as f64).sum::<f64>() / n;
    let mean_y = samples.iter().map(|&(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for &(x, y) in samples {
        let dx = x as f64 - mean_x;
        cov += dx * (y - mean_y);
        var += dx * dx;
    }
    if var == 0.0 {
        return None;
    }

    // Seconds per byte.
    let slope = cov / var;
    if slope <= 0.0 {
        return None;
    }
    let intercept = mean_y - slope * mean_x;
    let bitrate = 8.0 / slope;

    let timing_jitter_ns: Vec<f64> = samples
        .iter()
        .map(|&(x, y)| (y - (slope * x as f64 + intercept)) * 1e9)
        .collect();

    // Subtracting a centered moving average leaves the high-frequency
    // component. Near the edges the window is clamped to the data.
    let alignment_jitter_ns: Vec<f64> = if timing_jitter_ns.len() > ALIGNMENT_WINDOW {
        let half = ALIGNMENT_WINDOW / 2;
        timing_jitter_ns
            .iter()
            .enumerate()
            .map(|(i, &j)| {
                let lo = i.saturating_sub(half);
                let hi = (i + half + 1).min(timing_jitter_ns.len());
                let window = &timing_jitter_ns[lo..hi];
                let mean = window.iter().sum::<f64>() / window.len() as f64;
                j - mean
            })
            .collect()
    } else {
        timing_jitter_ns.clone()
    };

    let max_jitter_ns = timing_jitter_ns.iter().cloned().fold(f64::MIN, f64::max);
    let min_jitter_ns = timing_jitter_ns.iter().cloned().fold(f64::MAX, f64::min);
    let max_alignment_jitter_ns = alignment_jitter_ns
        .iter()
        .map(|j| j.abs())
        .fold(0.0, f64::max);

    Some(JitterAnalysis {
        samples: samples.len(),
        bitrate,
        max_jitter_ns,
        min_jitter_ns,
        max_alignment_jitter_ns,
        timing_jitter_ns,
        alignment_jitter_ns,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn perfect_stream_has_no_jitter() {
        // 10 Mbps: 1000 bytes take 1000 * 8 / 10_000_000 seconds.
        let samples: Vec<(u64, f64)> = (0..1000u64)
            .map(|i| (i * 1000, i as f64 * 1000.0 / 1_250_000.0))
            .collect();
        let analysis = analyze_pcr_samples(&samples).unwrap();
        assert!((analysis.bitrate - 10_000_000.0).abs() < 1.0);
        assert!(analysis.max_alignment_jitter_ns.abs() < 1.0);
        assert!(analysis.is_meaningful());
        assert!(!analysis.exceeds_accuracy_limit());
    }

    #[test]
    fn jittered_sample_is_caught() {
        let mut samples: Vec<(u64, f64)> = (0..1000u64)
            .map(|i| (i * 1000, i as f64 * 1000.0 / 1_250_000.0))
            .collect();
        // Push one sample 2µs late.
        samples[500].1 += 2e-6;
        let analysis = analyze_pcr_samples(&samples).unwrap();
        assert!(analysis.max_alignment_jitter_ns > 1000.0);
        assert!(analysis.exceeds_accuracy_limit());
    }

    #[test]
    fn slow_drift_exceeds_the_accuracy_limit() {
        // A 2µs sinusoidal wander with a long period: the centered moving
        // average tracks it, so the alignment residual stays tiny, but
        // the raw timing residual is far outside the limit.
        let samples: Vec<(u64, f64)> = (0..1800u64)
            .map(|i| {
                let drift = 2e-6 * (i as f64 * std::f64::consts::TAU / 600.0).sin();
                (i * 1000, i as f64 * 1000.0 / 1_250_000.0 + drift)
            })
            .collect();
        let analysis = analyze_pcr_samples(&samples).unwrap();
        assert!(analysis.max_jitter_ns > 500.0);
        assert!(analysis.max_alignment_jitter_ns < 500.0);
        assert!(analysis.exceeds_accuracy_limit());
    }

    #[test]
    fn too_few_samples() {
        assert!(analyze_pcr_samples(&[(0, 0.0)]).is_none());
    }

    #[test]
    fn degenerate_samples() {
        assert!(analyze_pcr_samples(&[(0, 0.0), (0, 1.0)]).is_none());
        assert!(analyze_pcr_samples(&[(0, 1.0), (1000, 0.0)]).is_none());
    }

    #[test]
    fn small_sample_count_is_not_meaningful() {
        let samples: Vec<(u64, f64)> = (0..5u64)
            .map(|i| (i * 1000, i as f64 * 0.01))
            .collect();
        let analysis = analyze_pcr_samples(&samples).unwrap();
        assert!(!analysis.is_meaningful());
    }
}
