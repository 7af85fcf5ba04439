//! The receiver's half of the heartbeat subsystem: tracking the sender's
//! session and sequence numbers to detect loss and sender restarts without
//! any reverse channel to confirm delivery.

/// What the analyzer learned from one observed heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The very first heartbeat this analyzer has ever seen. Per the
    /// design's resolution of the ambiguity around receiver-starts-after-
    /// sender ordering, this always establishes the session regardless of
    /// the carried sequence number.
    Established,
    /// A new session began with sequence zero — the sender restarted
    /// cleanly and this is its first beat.
    CleanRestart,
    /// A new session began with a nonzero starting sequence — this
    /// analyzer missed the sender's own restart and some number of its
    /// early heartbeats.
    ReceivedTooLate {
        /// The first sequence number observed from the new session.
        first_seq: i32,
    },
    /// Same session, and `lost` prior heartbeats were never observed.
    Loss {
        /// Number of heartbeats that never arrived.
        lost: i32,
    },
    /// Same session, next sequence number in order.
    InSequence,
}

/// Cumulative liveness statistics the analyzer maintains across the
/// receiver's lifetime. Reset whenever `session_id` changes (see
/// [`Stats::observe`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    session_id: Option<i32>,
    last_seq: i32,
    lost_count: u64,
}

impl Stats {
    /// Starts with no session observed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently observed session id, if any heartbeat has arrived.
    #[must_use]
    pub const fn session_id(&self) -> Option<i32> {
        self.session_id
    }

    /// The most recently observed sequence number within the current session.
    #[must_use]
    pub const fn last_seq(&self) -> i32 {
        self.last_seq
    }

    /// Total heartbeats inferred lost within the current session.
    #[must_use]
    pub const fn lost_count(&self) -> u64 {
        self.lost_count
    }

    /// Folds one observed `(session_id, seq)` pair into the running stats,
    /// returning what kind of event it represents.
    pub fn observe(&mut self, session_id: i32, seq: i32) -> Observation {
        match self.session_id {
            None => {
                self.session_id = Some(session_id);
                self.last_seq = seq;
                Observation::Established
            }
            Some(current) if current == session_id => {
                let lost = seq - self.last_seq - 1;
                self.last_seq = seq;
                if lost > 0 {
                    self.lost_count = self.lost_count.saturating_add(lost as u64);
                    Observation::Loss { lost }
                } else {
                    Observation::InSequence
                }
            }
            Some(_) => {
                self.session_id = Some(session_id);
                self.last_seq = seq;
                self.lost_count = 0;
                if seq == 0 {
                    Observation::CleanRestart
                } else {
                    Observation::ReceivedTooLate { first_seq: seq }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ever_heartbeat_establishes_the_session() {
        let mut stats = Stats::new();
        let obs = stats.observe(1000, 7);
        assert_eq!(obs, Observation::Established);
        assert_eq!(stats.session_id(), Some(1000));
        assert_eq!(stats.last_seq(), 7);
    }

    #[test]
    fn in_order_heartbeats_report_no_loss() {
        let mut stats = Stats::new();
        stats.observe(1000, 0);
        let obs = stats.observe(1000, 1);
        assert_eq!(obs, Observation::InSequence);
        assert_eq!(stats.lost_count(), 0);
    }

    #[test]
    fn heartbeat_gap_reports_and_accumulates_loss() {
        let mut stats = Stats::new();
        stats.observe(1000, 5);
        let obs = stats.observe(1000, 9);
        assert_eq!(obs, Observation::Loss { lost: 3 });
        assert_eq!(stats.lost_count(), 3);

        let obs = stats.observe(1000, 10);
        assert_eq!(obs, Observation::InSequence);
        assert_eq!(stats.lost_count(), 3);
    }

    #[test]
    fn new_session_with_seq_zero_is_a_clean_restart() {
        let mut stats = Stats::new();
        stats.observe(1000, 40);
        let obs = stats.observe(2000, 0);
        assert_eq!(obs, Observation::CleanRestart);
        assert_eq!(stats.session_id(), Some(2000));
        assert_eq!(stats.last_seq(), 0);
    }

    #[test]
    fn new_session_with_nonzero_seq_is_received_too_late() {
        let mut stats = Stats::new();
        stats.observe(1000, 40);
        let obs = stats.observe(2000, 12);
        assert_eq!(obs, Observation::ReceivedTooLate { first_seq: 12 });
    }

    #[test]
    fn session_change_resets_lost_count() {
        let mut stats = Stats::new();
        stats.observe(1000, 0);
        stats.observe(1000, 5);
        assert_eq!(stats.lost_count(), 4);
        stats.observe(2000, 0);
        assert_eq!(stats.lost_count(), 0);
    }

    #[test]
    fn last_seq_is_monotone_non_decreasing_within_a_session() {
        let mut stats = Stats::new();
        let mut seen = Vec::new();
        for seq in [0, 1, 4, 5, 10] {
            stats.observe(1, seq);
            seen.push(stats.last_seq());
        }
        assert!(seen.windows(2).all(|w| w[1] >= w[0]));
    }
}
