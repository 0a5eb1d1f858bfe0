//! Fatigue level state machine and per-subject temporal state

use frame_buffer::TimeWindow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::confidence::Ema;
use crate::config::{DmsConfig, ResolverConfig};

/// Discrete fatigue level, ordered `Low < Medium < High`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum FatigueLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl FatigueLevel {
    pub const ALL: [FatigueLevel; 3] =
        [FatigueLevel::Low, FatigueLevel::Medium, FatigueLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Apply the default hysteresis thresholds to one score
    pub fn resolve(score: f64, prev: FatigueLevel) -> FatigueLevel {
        resolve_level(score, prev, &ResolverConfig::default())
    }
}

impl std::fmt::Display for FatigueLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hysteresis step. Levels move at most one step per call.
pub fn resolve_level(score: f64, prev: FatigueLevel, thresholds: &ResolverConfig) -> FatigueLevel {
    match prev {
        FatigueLevel::Low if score > thresholds.medium_enter => FatigueLevel::Medium,
        FatigueLevel::Medium if score < thresholds.medium_exit => FatigueLevel::Low,
        FatigueLevel::Medium if score > thresholds.high_enter => FatigueLevel::High,
        FatigueLevel::High if score < thresholds.high_exit => FatigueLevel::Medium,
        _ => prev,
    }
}

/// Hysteresis state machine with a minimum-state-duration debounce
#[derive(Debug, Clone)]
pub struct FatigueResolver {
    config: ResolverConfig,
    level: FatigueLevel,
    /// When the current level was entered
    since_ms: Option<u64>,
}

impl FatigueResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            level: FatigueLevel::Low,
            since_ms: None,
        }
    }

    /// Evaluate one score at `now_ms`
    pub fn update(&mut self, score: f64, now_ms: u64) -> FatigueLevel {
        let since = *self.since_ms.get_or_insert(now_ms);
        let candidate = resolve_level(score, self.level, &self.config);

        if candidate != self.level {
            let held_ms = now_ms.saturating_sub(since);
            if held_ms < self.config.min_state_duration_ms {
                debug!(
                    from = %self.level,
                    to = %candidate,
                    held_ms,
                    "Level transition debounced"
                );
                return self.level;
            }
            debug!(from = %self.level, to = %candidate, score, "Fatigue level changed");
            self.level = candidate;
            self.since_ms = Some(now_ms);
        }
        self.level
    }

    pub fn level(&self) -> FatigueLevel {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = FatigueLevel::Low;
        self.since_ms = None;
    }
}

/// Subject state tracked across frames within one continuity segment
#[derive(Debug, Clone)]
pub struct SubjectState {
    /// Last frame with a detected face
    pub last_face_seen_ms: Option<u64>,
    /// Smoothed normalized EAR
    pub ear_ema: Ema,
    /// Raw normalized EAR history (for stability)
    pub normalized_ear_history: TimeWindow<f64>,
    /// Frames analysed since the baseline locked
    pub frames_since_baseline: u64,
}

impl SubjectState {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            last_face_seen_ms: None,
            ear_ema: Ema::new(config.score.ear_smoothing_alpha),
            normalized_ear_history: TimeWindow::new(config.stability.window_ms),
            frames_since_baseline: 0,
        }
    }

    /// Reset state (on continuity break)
    pub fn reset(&mut self) {
        self.last_face_seen_ms = None;
        self.ear_ema.reset();
        self.normalized_ear_history.clear();
        self.frames_since_baseline = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_documented_transitions() {
        use FatigueLevel::*;
        assert_eq!(FatigueLevel::resolve(0.60, Low), Medium);
        assert_eq!(FatigueLevel::resolve(0.40, Medium), Low);
        assert_eq!(FatigueLevel::resolve(0.80, Medium), High);
        assert_eq!(FatigueLevel::resolve(0.50, High), Medium);
        assert_eq!(FatigueLevel::resolve(0.50, Low), Low);
    }

    #[test]
    fn test_hysteresis_band_holds() {
        use FatigueLevel::*;
        assert_eq!(FatigueLevel::resolve(0.50, Medium), Medium);
        assert_eq!(FatigueLevel::resolve(0.70, High), High);
        assert_eq!(FatigueLevel::resolve(0.70, Medium), Medium);
        assert_eq!(FatigueLevel::resolve(0.99, Low), Medium);
        assert_eq!(FatigueLevel::resolve(0.0, High), Medium);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(FatigueLevel::Low < FatigueLevel::Medium);
        assert!(FatigueLevel::Medium < FatigueLevel::High);
    }

    #[test]
    fn test_min_state_duration_debounces() {
        let mut resolver = FatigueResolver::new(ResolverConfig::default());
        assert_eq!(resolver.update(0.2, 0), FatigueLevel::Low);
        assert_eq!(resolver.update(0.9, 1000), FatigueLevel::Low);
        assert_eq!(resolver.update(0.9, 5000), FatigueLevel::Medium);
        // HIGH needs another 5s in MEDIUM
        assert_eq!(resolver.update(0.9, 6000), FatigueLevel::Medium);
        assert_eq!(resolver.update(0.9, 10_000), FatigueLevel::High);
    }

    #[test]
    fn test_reset_returns_to_low() {
        let mut resolver = FatigueResolver::new(ResolverConfig {
            min_state_duration_ms: 0,
            ..Default::default()
        });
        resolver.update(0.9, 0);
        resolver.reset();
        assert_eq!(resolver.level(), FatigueLevel::Low);
    }

    proptest! {
        #[test]
        fn prop_never_skips_medium(
            scores in proptest::collection::vec(0.0f64..=1.0, 1..200)
        ) {
            let mut resolver = FatigueResolver::new(ResolverConfig {
                min_state_duration_ms: 0,
                ..Default::default()
            });
            let mut prev = resolver.level();
            for (i, score) in scores.into_iter().enumerate() {
                let next = resolver.update(score, i as u64 * 100);
                let jumped = matches!(
                    (prev, next),
                    (FatigueLevel::Low, FatigueLevel::High)
                        | (FatigueLevel::High, FatigueLevel::Low)
                );
                prop_assert!(!jumped);
                prev = next;
            }
        }
    }
}
