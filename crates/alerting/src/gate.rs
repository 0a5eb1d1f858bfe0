//! Alert gate implementation

use dms::{FatigueLevel, FatigueResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::sink::AlertPattern;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Confidence below this suppresses alerting (default: 0.7)
    pub confidence_threshold: f64,
    /// Minimum time between alerts (milliseconds, default: 30s)
    pub cooldown_ms: u64,
    /// Consecutive qualifying evaluations required at MEDIUM
    pub medium_required: u32,
    /// Consecutive qualifying evaluations required at HIGH
    pub high_required: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            cooldown_ms: 30_000,
            medium_required: 3,
            high_required: 2,
        }
    }
}

impl AlertConfig {
    /// Sustained count needed before `level` may alert; `None` never alerts
    pub fn required_for(&self, level: FatigueLevel) -> Option<u32> {
        match level {
            FatigueLevel::Low => None,
            FatigueLevel::Medium => Some(self.medium_required),
            FatigueLevel::High => Some(self.high_required),
        }
    }
}

/// Alert bookkeeping owned by the session context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub sustained_count: u32,
    pub last_level: Option<FatigueLevel>,
    pub last_alert_ms: Option<u64>,
}

/// Why a frame could not alert at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressReason {
    NoFace,
    Calibrating,
    LowConfidence,
    LowLevel,
}

/// Gate outcome for one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    /// A hard gate fired; sustained counting restarted
    Suppressed(SuppressReason),
    /// Level is elevated but not yet sustained
    Pending { sustained: u32, required: u32 },
    /// Sustained, but the previous alert is too recent
    Cooldown { remaining_ms: u64 },
    /// Play this pattern
    Fire(AlertPattern),
}

impl AlertDecision {
    pub fn should_fire(&self) -> bool {
        matches!(self, AlertDecision::Fire(_))
    }
}

/// Pure gate step: next state plus decision for `result` at `now_ms`
pub fn decide(
    result: &FatigueResult,
    state: &AlertState,
    config: &AlertConfig,
    now_ms: u64,
) -> (AlertState, AlertDecision) {
    let hard_gate = if !result.face_detected {
        Some(SuppressReason::NoFace)
    } else if result.is_calibrating {
        Some(SuppressReason::Calibrating)
    } else if result.confidence < config.confidence_threshold {
        Some(SuppressReason::LowConfidence)
    } else {
        config
            .required_for(result.fatigue_level)
            .is_none()
            .then_some(SuppressReason::LowLevel)
    };

    if let Some(reason) = hard_gate {
        let next = AlertState {
            sustained_count: 0,
            last_level: None,
            last_alert_ms: state.last_alert_ms,
        };
        return (next, AlertDecision::Suppressed(reason));
    }

    let level = result.fatigue_level;
    let mut next = state.clone();
    if next.last_level == Some(level) {
        next.sustained_count = next.sustained_count.saturating_add(1);
    } else {
        next.last_level = Some(level);
        next.sustained_count = 1;
    }

    // Non-LOW levels always have a requirement; the hard gate covered LOW
    let required = config.required_for(level).unwrap_or(u32::MAX);
    if next.sustained_count < required {
        let decision = AlertDecision::Pending {
            sustained: next.sustained_count,
            required,
        };
        return (next, decision);
    }

    if let Some(last) = state.last_alert_ms {
        let elapsed = now_ms.saturating_sub(last);
        if elapsed < config.cooldown_ms {
            let decision = AlertDecision::Cooldown {
                remaining_ms: config.cooldown_ms - elapsed,
            };
            return (next, decision);
        }
    }

    next.last_alert_ms = Some(now_ms);
    (next, AlertDecision::Fire(AlertPattern::for_level(level)))
}

/// Stateful wrapper around [`decide`] for one session
#[derive(Debug, Clone, Default)]
pub struct AlertGate {
    config: AlertConfig,
    state: AlertState,
    alerts_fired: u32,
}

impl AlertGate {
    /// Create a new alert gate
    pub fn new(config: AlertConfig) -> Self {
        debug!(?config, "Creating alert gate");
        Self {
            config,
            state: AlertState::default(),
            alerts_fired: 0,
        }
    }

    /// Evaluate one result and advance the gate state
    pub fn evaluate(&mut self, result: &FatigueResult, now_ms: u64) -> AlertDecision {
        let (next, decision) = decide(result, &self.state, &self.config, now_ms);
        self.state = next;

        match &decision {
            AlertDecision::Fire(pattern) => {
                self.alerts_fired += 1;
                info!(
                    level = %result.fatigue_level,
                    confidence = result.confidence,
                    ?pattern,
                    count = self.alerts_fired,
                    "Fatigue alert fired"
                );
            }
            AlertDecision::Cooldown { remaining_ms } => {
                debug!(remaining_ms, "Alert suppressed: in cooldown period");
            }
            AlertDecision::Pending { sustained, required } => {
                debug!(sustained, required, "Alert pending: level not yet sustained");
            }
            AlertDecision::Suppressed(reason) => {
                debug!(?reason, "Alert suppressed");
            }
        }
        decision
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Alerts fired since the count was last taken
    pub fn alerts_fired(&self) -> u32 {
        self.alerts_fired
    }

    /// Return the fired-alert count and restart it (session boundary)
    pub fn take_alerts_fired(&mut self) -> u32 {
        std::mem::take(&mut self.alerts_fired)
    }

    /// Clear sustained counting and cooldown (continuity break).
    ///
    /// The fired-alert count belongs to the session and survives.
    pub fn reset(&mut self) {
        self.state = AlertState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn result(level: FatigueLevel, confidence: f64) -> FatigueResult {
        FatigueResult {
            face_detected: true,
            is_calibrating: false,
            fatigue_level: level,
            confidence,
            ..Default::default()
        }
    }

    #[test]
    fn test_high_fires_on_second_evaluation() {
        let mut gate = AlertGate::default();
        let high = result(FatigueLevel::High, 0.9);

        assert!(!gate.evaluate(&high, 0).should_fire());
        assert_eq!(
            gate.evaluate(&high, 1000),
            AlertDecision::Fire(AlertPattern::Long)
        );
        assert_eq!(gate.alerts_fired(), 1);
    }

    #[test]
    fn test_cooldown_blocks_repeat() {
        let mut gate = AlertGate::default();
        let high = result(FatigueLevel::High, 0.9);

        gate.evaluate(&high, 0);
        assert!(gate.evaluate(&high, 1000).should_fire());
        assert!(matches!(
            gate.evaluate(&high, 2000),
            AlertDecision::Cooldown { remaining_ms: 29_000 }
        ));
        assert_eq!(gate.alerts_fired(), 1);

        assert!(gate.evaluate(&high, 31_000).should_fire());
        assert_eq!(gate.alerts_fired(), 2);
    }

    #[test]
    fn test_medium_needs_three() {
        let mut gate = AlertGate::default();
        let medium = result(FatigueLevel::Medium, 0.8);

        assert_eq!(
            gate.evaluate(&medium, 0),
            AlertDecision::Pending { sustained: 1, required: 3 }
        );
        assert!(!gate.evaluate(&medium, 1).should_fire());
        assert_eq!(
            gate.evaluate(&medium, 2),
            AlertDecision::Fire(AlertPattern::Short)
        );
    }

    #[test]
    fn test_level_change_restarts_count() {
        let mut gate = AlertGate::default();
        gate.evaluate(&result(FatigueLevel::Medium, 0.8), 0);
        gate.evaluate(&result(FatigueLevel::Medium, 0.8), 1);
        gate.evaluate(&result(FatigueLevel::High, 0.8), 2);

        assert_eq!(gate.state().sustained_count, 1);
        assert_eq!(gate.state().last_level, Some(FatigueLevel::High));
    }

    #[test]
    fn test_hard_gates_reset_count() {
        let mut gate = AlertGate::default();
        let high = result(FatigueLevel::High, 0.9);

        gate.evaluate(&high, 0);
        assert_eq!(
            gate.evaluate(&result(FatigueLevel::High, 0.5), 1),
            AlertDecision::Suppressed(SuppressReason::LowConfidence)
        );
        assert_eq!(gate.state().sustained_count, 0);
        assert!(!gate.evaluate(&high, 2).should_fire());

        let calibrating = FatigueResult {
            is_calibrating: true,
            ..high.clone()
        };
        assert_eq!(
            gate.evaluate(&calibrating, 3),
            AlertDecision::Suppressed(SuppressReason::Calibrating)
        );

        let no_face = FatigueResult::no_face(4);
        assert_eq!(
            gate.evaluate(&no_face, 4),
            AlertDecision::Suppressed(SuppressReason::NoFace)
        );

        assert_eq!(
            gate.evaluate(&result(FatigueLevel::Low, 0.9), 5),
            AlertDecision::Suppressed(SuppressReason::LowLevel)
        );
    }

    #[test]
    fn test_hard_gate_keeps_cooldown() {
        let mut gate = AlertGate::default();
        let high = result(FatigueLevel::High, 0.9);
        gate.evaluate(&high, 0);
        gate.evaluate(&high, 1);

        gate.evaluate(&result(FatigueLevel::Low, 0.9), 2);
        assert_eq!(gate.state().last_alert_ms, Some(1));
        gate.evaluate(&high, 3);
        assert!(matches!(gate.evaluate(&high, 4), AlertDecision::Cooldown { .. }));
    }

    #[test]
    fn test_reset_clears_decision_state() {
        let mut gate = AlertGate::default();
        let high = result(FatigueLevel::High, 0.9);
        gate.evaluate(&high, 0);
        gate.evaluate(&high, 1);

        gate.reset();
        assert_eq!(gate.state(), &AlertState::default());
        assert_eq!(gate.alerts_fired(), 1);

        gate.evaluate(&high, 2);
        assert!(gate.evaluate(&high, 3).should_fire());
        assert_eq!(gate.take_alerts_fired(), 2);
        assert_eq!(gate.alerts_fired(), 0);
    }

    proptest! {
        #[test]
        fn prop_alerts_respect_cooldown(
            steps in proptest::collection::vec((0u8..3, 0.0f64..=1.0, 1u64..5000), 1..300)
        ) {
            let mut gate = AlertGate::default();
            let mut now = 0u64;
            let mut last_fire: Option<u64> = None;
            for (level, confidence, dt) in steps {
                now += dt;
                let level = FatigueLevel::ALL[level as usize];
                if gate.evaluate(&result(level, confidence), now).should_fire() {
                    prop_assert!(level != FatigueLevel::Low);
                    prop_assert!(confidence >= 0.7);
                    if let Some(prev) = last_fire {
                        prop_assert!(now - prev >= 30_000);
                    }
                    last_fire = Some(now);
                }
            }
        }
    }
}
