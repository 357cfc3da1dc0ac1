//! Drowsiness state tracking

use serde::{Deserialize, Serialize};

/// Fewest visible eyes that count as "awake" for a frame
pub const MIN_OPEN_EYES: usize = 2;

/// Binary alert decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertState {
    #[default]
    Safe,
    Alert,
}

impl AlertState {
    pub fn is_alert(self) -> bool {
        self == AlertState::Alert
    }
}

/// Edge between two consecutive observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Safe -> Alert
    Raised,
    /// Alert -> Safe
    Cleared,
}

/// Counter record owned by the state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrowsinessState {
    /// Frames in a row with fewer than two eyes visible
    pub consecutive_low_eye_frames: u32,
    /// `consecutive_low_eye_frames > threshold`
    pub alert_active: bool,
}

/// Threshold state machine: slow to enter Alert, instant to leave it.
#[derive(Debug, Clone)]
pub struct DrowsinessStateMachine {
    threshold: u32,
    state: DrowsinessState,
}

impl DrowsinessStateMachine {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            state: DrowsinessState::default(),
        }
    }

    /// Feed one frame's eye count.
    pub fn observe(&mut self, eye_count: usize) -> AlertState {
        if eye_count < MIN_OPEN_EYES {
            self.state.consecutive_low_eye_frames =
                self.state.consecutive_low_eye_frames.saturating_add(1);
        } else {
            self.state.consecutive_low_eye_frames = 0;
        }

        // Strictly greater: a counter equal to the threshold is still safe.
        self.state.alert_active = self.state.consecutive_low_eye_frames > self.threshold;
        self.alert_state()
    }

    pub fn alert_state(&self) -> AlertState {
        if self.state.alert_active {
            AlertState::Alert
        } else {
            AlertState::Safe
        }
    }

    pub fn state(&self) -> DrowsinessState {
        self.state
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Back to the initial `{0, false}` state
    pub fn reset(&mut self) {
        self.state = DrowsinessState::default();
    }
}

impl Transition {
    pub fn between(before: AlertState, after: AlertState) -> Option<Self> {
        match (before, after) {
            (AlertState::Safe, AlertState::Alert) => Some(Transition::Raised),
            (AlertState::Alert, AlertState::Safe) => Some(Transition::Cleared),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const THRESHOLD: u32 = 35;

    #[test]
    fn test_threshold_boundary() {
        let mut machine = DrowsinessStateMachine::new(THRESHOLD);
        for _ in 0..THRESHOLD {
            assert_eq!(machine.observe(0), AlertState::Safe);
        }
        assert_eq!(machine.state().consecutive_low_eye_frames, THRESHOLD);
        assert_eq!(machine.observe(0), AlertState::Alert);
        assert!(machine.state().alert_active);
    }

    #[test]
    fn test_single_open_frame_clears_alert() {
        let mut machine = DrowsinessStateMachine::new(3);
        for _ in 0..10 {
            machine.observe(1);
        }
        assert!(machine.alert_state().is_alert());

        assert_eq!(machine.observe(2), AlertState::Safe);
        assert_eq!(machine.state(), DrowsinessState::default());
    }

    #[test]
    fn test_scripted_scenario() {
        let script: Vec<usize> = std::iter::repeat(2)
            .take(10)
            .chain(std::iter::repeat(0).take(40))
            .chain(std::iter::repeat(2).take(5))
            .collect();

        let mut machine = DrowsinessStateMachine::new(THRESHOLD);
        for (i, &eyes) in script.iter().enumerate() {
            let frame = i + 1;
            let state = machine.observe(eyes);
            let counter = machine.state().consecutive_low_eye_frames;
            match frame {
                1..=10 => {
                    assert_eq!(state, AlertState::Safe);
                    assert_eq!(counter, 0);
                }
                11..=45 => {
                    assert_eq!(state, AlertState::Safe, "frame {frame}");
                    assert_eq!(counter, (frame - 10) as u32);
                }
                46..=50 => {
                    assert_eq!(state, AlertState::Alert, "frame {frame}");
                    assert_eq!(counter, (frame - 10) as u32);
                }
                _ => {
                    assert_eq!(state, AlertState::Safe);
                    assert_eq!(counter, 0);
                }
            }
        }
        assert_eq!(machine.state().consecutive_low_eye_frames, 0);
    }

    #[test]
    fn test_reset() {
        let mut machine = DrowsinessStateMachine::new(0);
        machine.observe(0);
        assert!(machine.alert_state().is_alert());
        machine.reset();
        assert_eq!(machine.alert_state(), AlertState::Safe);
        assert_eq!(machine.state().consecutive_low_eye_frames, 0);
    }

    #[test]
    fn test_transition_edges() {
        assert_eq!(
            Transition::between(AlertState::Safe, AlertState::Alert),
            Some(Transition::Raised)
        );
        assert_eq!(
            Transition::between(AlertState::Alert, AlertState::Safe),
            Some(Transition::Cleared)
        );
        assert_eq!(Transition::between(AlertState::Alert, AlertState::Alert), None);
    }

    proptest! {
        #[test]
        fn prop_alert_matches_counter(counts in prop::collection::vec(0usize..5, 0..200), threshold in 0u32..60) {
            let mut machine = DrowsinessStateMachine::new(threshold);
            let mut expected_counter = 0u32;
            for eyes in counts {
                let state = machine.observe(eyes);
                expected_counter = if eyes < MIN_OPEN_EYES { expected_counter + 1 } else { 0 };
                prop_assert_eq!(machine.state().consecutive_low_eye_frames, expected_counter);
                prop_assert_eq!(state.is_alert(), expected_counter > threshold);
                prop_assert_eq!(machine.state().alert_active, state.is_alert());
            }
        }

        #[test]
        fn prop_open_eyes_idempotent(eyes in 2usize..10, repeats in 1usize..100) {
            let mut machine = DrowsinessStateMachine::new(THRESHOLD);
            for _ in 0..repeats {
                prop_assert_eq!(machine.observe(eyes), AlertState::Safe);
                prop_assert_eq!(machine.state().consecutive_low_eye_frames, 0);
            }
        }

        #[test]
        fn prop_single_burst(before in 0usize..20, after in 1usize..20) {
            let mut machine = DrowsinessStateMachine::new(THRESHOLD);
            for _ in 0..before {
                prop_assert!(!machine.observe(2).is_alert());
            }
            for n in 1..=(THRESHOLD + 1) {
                let alert = machine.observe(0).is_alert();
                prop_assert_eq!(alert, n == THRESHOLD + 1);
            }
            prop_assert!(!machine.observe(2).is_alert());
            for _ in 1..after {
                prop_assert!(!machine.observe(2).is_alert());
            }
        }
    }
}
