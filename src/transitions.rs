use std::collections::VecDeque;

use bevy::log::warn;
use serde::Serialize;

use crate::state::{AvatarState, Direction};

const MAX_TRANSITIONS: usize = 500;

/// One recorded state change.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TransitionRecord {
    pub frame: u64,
    pub from: String,
    pub to: String,
    pub direction: Direction,
}

impl TransitionRecord {
    pub fn new(frame: u64, from: AvatarState, to: AvatarState, direction: Direction) -> Self {
        Self {
            frame,
            from: from.to_string(),
            to: to.to_string(),
            direction,
        }
    }
}

/// Bounded history of state transitions, oldest dropped first.
#[derive(Default, Clone, Debug)]
pub struct TransitionLog {
    pub recent: VecDeque<TransitionRecord>,
    pub dropped: u64,
    last_overflow_log_frame: u64,
}

impl TransitionLog {
    pub fn record(&mut self, record: TransitionRecord) {
        let frame = record.frame;
        self.recent.push_back(record);
        if self.recent.len() > MAX_TRANSITIONS {
            let excess = self.recent.len() - MAX_TRANSITIONS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped = self.dropped.saturating_add(excess as u64);
            if frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = frame;
                warn!(
                    "[Charlie avatar] Dropped {} logged transitions (total dropped: {})",
                    excess, self.dropped
                );
            }
        }
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.recent.back()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&mut self) -> Vec<TransitionRecord> {
        self.recent.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
        self.dropped = 0;
        self.last_overflow_log_frame = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{RunningState, StandingState};

    #[test]
    fn log_tracks_dropped_records() {
        let mut log = TransitionLog::default();
        for i in 0..(MAX_TRANSITIONS + 25) {
            log.record(TransitionRecord::new(
                i as u64,
                StandingState::Standing.into(),
                RunningState::StandingToRunning.into(),
                Direction::Right,
            ));
        }
        assert_eq!(log.len(), MAX_TRANSITIONS);
        assert_eq!(log.dropped, 25);
        assert_eq!(log.last().map(|r| r.frame), Some((MAX_TRANSITIONS + 24) as u64));
    }

    #[test]
    fn records_use_full_state_names() {
        let record = TransitionRecord::new(
            3,
            StandingState::Standing.into(),
            RunningState::StandingToRunning.into(),
            Direction::Left,
        );
        assert_eq!(record.from, "Charlie_Standing/Standing");
        assert_eq!(record.to, "Charlie_Running/Standing_To_Running");
    }
}
