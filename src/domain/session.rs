//! Measurement session state machine.
//!
//! Walks a therapy session through five fixed steps with a timed
//! isometric hold between steps three and four. Transitions only move
//! forward; the countdown is the single time-driven transition and is
//! advanced by an explicit [`MeasurementWizard::tick`] so the machine
//! stays deterministic under test.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds the isometric hold lasts.
pub const STRENGTH_HOLD_SECONDS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Preparation,
    InitialRom,
    StrengthTest,
    ContinueRom,
    EndTest,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        match self {
            Self::Preparation => 1,
            Self::InitialRom => 2,
            Self::StrengthTest => 3,
            Self::ContinueRom => 4,
            Self::EndTest => 5,
        }
    }
}

/// Final results of a completed session.
///
/// The values are placeholders for sensor-derived measurements, drawn
/// uniformly from the clinically plausible windows.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub rom_degrees: i32,
    pub strength_units: i32,
    pub recommendations: Vec<String>,
}

#[derive(Debug)]
pub struct MeasurementWizard {
    step: WizardStep,
    timer_seconds: u32,
    strength_test_active: bool,
}

impl Default for MeasurementWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Preparation,
            timer_seconds: STRENGTH_HOLD_SECONDS,
            strength_test_active: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn timer_seconds(&self) -> u32 {
        self.timer_seconds
    }

    pub fn strength_test_active(&self) -> bool {
        self.strength_test_active
    }

    /// User-driven forward transition. Returns `false` when the current
    /// step has no user-driven exit (the hold and the final step).
    pub fn advance(&mut self) -> bool {
        self.step = match self.step {
            WizardStep::Preparation => WizardStep::InitialRom,
            WizardStep::InitialRom => WizardStep::StrengthTest,
            WizardStep::ContinueRom => WizardStep::EndTest,
            WizardStep::StrengthTest | WizardStep::EndTest => return false,
        };
        true
    }

    /// Arm the countdown. Only valid at step three, before the hold has
    /// started.
    pub fn start_strength_hold(&mut self) -> bool {
        if self.step != WizardStep::StrengthTest || self.strength_test_active {
            return false;
        }
        self.strength_test_active = true;
        self.timer_seconds = STRENGTH_HOLD_SECONDS;
        true
    }

    /// Advance the countdown by one second. Returns `true` when the hold
    /// just completed, which also moves the session to step four.
    pub fn tick(&mut self) -> bool {
        if !self.strength_test_active {
            return false;
        }
        self.timer_seconds = self.timer_seconds.saturating_sub(1);
        if self.timer_seconds == 0 {
            self.strength_test_active = false;
            self.step = WizardStep::ContinueRom;
            return true;
        }
        false
    }

    /// End the session. Only valid at step five; computes the final
    /// result and leaves the wizard spent.
    pub fn finish(&mut self) -> Option<SessionResult> {
        if self.step != WizardStep::EndTest {
            return None;
        }

        let mut seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(12345)
            | 1;
        let mut next = || {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            seed >> 16
        };

        let rom_degrees = 90 + (next() % 90) as i32;
        let strength_units = 30 + (next() % 70) as i32;

        Some(SessionResult {
            recommendations: recommendations_for(rom_degrees, strength_units),
            rom_degrees,
            strength_units,
        })
    }
}

fn recommendations_for(rom_degrees: i32, strength_units: i32) -> Vec<String> {
    vec![
        format!("Based on ROM ({rom_degrees}\u{b0}) and Strength ({strength_units} units):"),
        "Perform gentle active-assisted ROM exercises twice daily.".to_string(),
        "Isometric strengthening for 10-second holds, 10 repetitions.".to_string(),
        "Consider applying heat pack before exercises.".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_session_walkthrough() {
        let mut wizard = MeasurementWizard::new();
        assert_eq!(wizard.step(), WizardStep::Preparation);

        assert!(wizard.advance()); // begin
        assert_eq!(wizard.step(), WizardStep::InitialRom);

        assert!(wizard.advance()); // reached target angle
        assert_eq!(wizard.step(), WizardStep::StrengthTest);
        assert!(!wizard.strength_test_active());

        assert!(wizard.start_strength_hold());
        assert!(wizard.strength_test_active());
        assert_eq!(wizard.timer_seconds(), 3);

        assert!(!wizard.tick());
        assert!(!wizard.tick());
        assert!(wizard.tick()); // third tick completes the hold
        assert!(!wizard.strength_test_active());
        assert_eq!(wizard.step(), WizardStep::ContinueRom);

        assert!(wizard.advance()); // continue
        assert_eq!(wizard.step(), WizardStep::EndTest);

        let result = wizard.finish().expect("session should produce a result");
        assert!((90..180).contains(&result.rom_degrees));
        assert!((30..100).contains(&result.strength_units));
        assert_eq!(result.recommendations.len(), 4);
        assert!(result.recommendations[3].contains("heat pack"));
    }

    #[test]
    fn no_skipping_or_backward_transitions() {
        let mut wizard = MeasurementWizard::new();
        wizard.advance();
        wizard.advance();

        // step three only exits through the completed hold
        assert!(!wizard.advance());
        assert_eq!(wizard.step(), WizardStep::StrengthTest);
        assert!(wizard.finish().is_none());

        // the hold cannot be re-armed while running
        assert!(wizard.start_strength_hold());
        assert!(!wizard.start_strength_hold());
    }

    #[test]
    fn tick_is_inert_while_the_hold_is_not_armed() {
        let mut wizard = MeasurementWizard::new();
        assert!(!wizard.tick());
        assert_eq!(wizard.step(), WizardStep::Preparation);
        assert_eq!(wizard.timer_seconds(), STRENGTH_HOLD_SECONDS);
    }

    #[test]
    fn hold_cannot_start_outside_step_three() {
        let mut wizard = MeasurementWizard::new();
        assert!(!wizard.start_strength_hold());
        wizard.advance();
        assert!(!wizard.start_strength_hold());
    }
}
