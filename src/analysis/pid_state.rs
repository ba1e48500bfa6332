use crate::mpegts::ContinuityCounter;

/// A PCR gap larger than this many seconds is treated as a splice or
/// timestamp wrap and excluded from the interval statistics.
const DISCONTINUITY_GAP_SECS: f64 = 5.0;

/// Running min/max/average over a series of interval measurements.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntervalStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

impl IntervalStats {
    pub fn record(&mut self, value: f64) {
        if self.count == 0 || value < self.min {
            self.min = value;
        }
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.sum += value;
        self.count += 1;
    }

    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Per-PID accumulator updated once for every packet carrying that PID.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PidState {
    pub packets: u64,
    pub continuity_errors: u64,
    pub scrambled_count: u64,

    last_cc: Option<ContinuityCounter>,
    last_offset: Option<u64>,

    /// `(byte_offset, pcr_seconds)` pairs, input to the jitter regression.
    pub pcr_samples: Vec<(u64, f64)>,
    pub pcr_intervals: Vec<f64>,
    last_pcr: Option<f64>,

    pub pts_intervals: Vec<f64>,
    last_pts: Option<f64>,

    /// Packet arrival spacing in bytes, for the average-interval column.
    pub arrival: IntervalStats,

    pub pes_len_sum: u64,
    pub pes_count: u64,
}

impl PidState {
    /// Checks the continuity counter against the previous payload packet.
    ///
    /// Returns `true` when a discontinuity was detected. The first payload
    /// packet on a PID establishes the baseline, duplicates are accepted,
    /// and packets without payload neither check nor advance the counter.
    pub fn note_continuity(&mut self, cc: ContinuityCounter, has_payload: bool) -> bool {
        if !has_payload {
            return false;
        }
        let error = match self.last_cc {
            Some(prev) => !(cc.follows(prev) || cc == prev),
            None => false,
        };
        self.last_cc = Some(cc);
        if error {
            self.continuity_errors += 1;
        }
        error
    }

    pub fn note_arrival(&mut self, offset: u64) {
        if let Some(prev) = self.last_offset {
            self.arrival.record((offset - prev) as f64);
        }
        self.last_offset = Some(offset);
    }

    pub fn note_scrambled(&mut self) {
        self.scrambled_count += 1;
    }

    pub fn note_pcr(&mut self, offset: u64, secs: f64) {
        if let Some(prev) = self.last_pcr {
            let gap = secs - prev;
            if gap > 0.0 && gap < DISCONTINUITY_GAP_SECS {
                self.pcr_intervals.push(gap);
            }
        }
        self.last_pcr = Some(secs);
        self.pcr_samples.push((offset, secs));
    }

    pub fn note_pts(&mut self, secs: f64) {
        if let Some(prev) = self.last_pts {
            let gap = secs - prev;
            if gap > 0.0 && gap < DISCONTINUITY_GAP_SECS {
                self.pts_intervals.push(gap);
            }
        }
        self.last_pts = Some(secs);
    }

    /// Length 0 means an unbounded packet (usual for video) and carries
    /// no size information, so it stays out of the average.
    pub fn note_pes_len(&mut self, len: u16) {
        if len == 0 {
            return;
        }
        self.pes_len_sum += u64::from(len);
        self.pes_count += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cc(n: u8) -> ContinuityCounter {
        ContinuityCounter::from_u8(n)
    }

    #[test]
    fn consecutive_counters_are_clean() {
        let mut state = PidState::default();
        for n in [0, 1, 2, 3] {
            assert!(!state.note_continuity(cc(n), true));
        }
        assert_eq!(state.continuity_errors, 0);
    }

    #[test]
    fn skipped_counter_is_an_error() {
        let mut state = PidState::default();
        state.note_continuity(cc(0), true);
        state.note_continuity(cc(1), true);
        assert!(state.note_continuity(cc(3), true));
        assert_eq!(state.continuity_errors, 1);
    }

    #[test]
    fn duplicate_counter_is_accepted() {
        let mut state = PidState::default();
        state.note_continuity(cc(0), true);
        assert!(!state.note_continuity(cc(0), true));
        assert!(!state.note_continuity(cc(1), true));
        assert_eq!(state.continuity_errors, 0);
    }

    #[test]
    fn counter_wraps_at_sixteen() {
        let mut state = PidState::default();
        state.note_continuity(cc(15), true);
        assert!(!state.note_continuity(cc(0), true));
    }

    #[test]
    fn payloadless_packets_are_ignored() {
        let mut state = PidState::default();
        state.note_continuity(cc(0), true);
        assert!(!state.note_continuity(cc(9), false));
        assert!(!state.note_continuity(cc(1), true));
        assert_eq!(state.continuity_errors, 0);
    }

    #[test]
    fn pcr_gap_filter() {
        let mut state = PidState::default();
        state.note_pcr(0, 0.0);
        state.note_pcr(188, 0.04);
        state.note_pcr(376, 10.0); // splice, excluded
        state.note_pcr(564, 10.04);
        assert_eq!(state.pcr_intervals.len(), 2);
        assert_eq!(state.pcr_samples.len(), 4);
    }

    #[test]
    fn unbounded_pes_packets_stay_out_of_the_average() {
        let mut state = PidState::default();
        state.note_pes_len(0);
        state.note_pes_len(0);
        assert_eq!(state.pes_count, 0);

        state.note_pes_len(184);
        state.note_pes_len(0);
        assert_eq!(state.pes_count, 1);
        assert_eq!(state.pes_len_sum, 184);
    }

    #[test]
    fn interval_stats_track_extremes() {
        let mut stats = IntervalStats::default();
        stats.record(2.0);
        stats.record(6.0);
        stats.record(4.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.avg(), Some(4.0));
        assert_eq!(IntervalStats::default().avg(), None);
    }
}
