use crate::config::{Config, FusionConfig};
use crate::events::{
    AccessibilityReading, Confidence, ProcessReading, SignalSnapshot, StateFileReading,
};

/// Порог метки "high"; не влияет на `raw_busy`
pub const HIGH_CONFIDENCE_SCORE: f64 = 0.75;
/// Нижняя граница метки "medium"
pub const MEDIUM_CONFIDENCE_SCORE: f64 = 0.45;

/// Детерминированное взвешенное слияние трёх сигналов.
///
/// Веса аддитивны и независимы: ни один сигнал не гасит другой.
#[derive(Debug, Clone, Copy)]
pub struct SignalFusionEngine {
    weights: FusionConfig,
    cpu_busy_threshold: f64,
    freshness_window_secs: f64,
}

impl SignalFusionEngine {
    pub fn new(config: &Config) -> Self {
        Self::with_params(
            config.fusion,
            config.probe.process_cpu_busy_threshold,
            config.probe.state_freshness_window_secs,
        )
    }

    pub fn with_params(
        weights: FusionConfig,
        cpu_busy_threshold: f64,
        freshness_window_secs: f64,
    ) -> Self {
        Self {
            weights,
            cpu_busy_threshold,
            freshness_window_secs,
        }
    }

    pub fn fuse(
        &self,
        process: &ProcessReading,
        state_file: &StateFileReading,
        accessibility: AccessibilityReading,
    ) -> SignalSnapshot {
        let process_busy =
            !process.pids.is_empty() && process.cpu_percent >= self.cpu_busy_threshold;

        let state_fresh = state_file.exists
            && state_file
                .age_seconds
                .map_or(false, |age| age <= self.freshness_window_secs);

        // Совпадение имеет смысл только при выданном разрешении
        let accessibility_matched = accessibility.trusted && accessibility.matched;

        let raw_score = self.score(accessibility_matched, process_busy, state_fresh);

        SignalSnapshot {
            target_process_ids: process.pids.clone(),
            process_cpu_percent: process.cpu_percent,
            process_busy,
            state_file_exists: state_file.exists,
            state_file_age_seconds: state_file.age_seconds,
            state_fresh,
            accessibility_trusted: accessibility.trusted,
            accessibility_matched,
            raw_score,
            confidence: confidence_for(raw_score, accessibility.trusted),
            raw_busy: raw_score >= self.weights.busy_score_threshold,
        }
    }

    pub fn score(&self, accessibility_matched: bool, process_busy: bool, state_fresh: bool) -> f64 {
        let mut score = 0.0;
        if accessibility_matched {
            score += self.weights.accessibility_weight;
        }
        if process_busy {
            score += self.weights.process_weight;
        }
        if state_fresh {
            score += self.weights.state_weight;
        }
        score.clamp(0.0, 1.0)
    }
}

/// Метка уверенности как чистая функция от очков и доверия
pub fn confidence_for(score: f64, trusted: bool) -> Confidence {
    if score >= HIGH_CONFIDENCE_SCORE {
        Confidence::High
    } else if score >= MEDIUM_CONFIDENCE_SCORE {
        if trusted {
            Confidence::Medium
        } else {
            Confidence::MediumHeuristic
        }
    } else if trusted {
        Confidence::Low
    } else {
        Confidence::LowHeuristic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SignalFusionEngine {
        SignalFusionEngine::new(&Config::default())
    }

    fn busy_process() -> ProcessReading {
        ProcessReading::new([101, 102].into_iter().collect(), 12.0)
    }

    fn fresh_state() -> StateFileReading {
        StateFileReading {
            exists: true,
            age_seconds: Some(3.0),
            ..StateFileReading::default()
        }
    }

    #[test]
    fn accessibility_alone_is_busy() {
        let snap = engine().fuse(
            &ProcessReading::empty(),
            &StateFileReading::missing(),
            AccessibilityReading::trusted(true),
        );
        assert!((snap.raw_score - 0.60).abs() < 1e-9);
        assert!(snap.raw_busy);
        assert_eq!(snap.confidence, Confidence::Medium);
    }

    #[test]
    fn process_and_state_alone_are_not_busy() {
        let snap = engine().fuse(&busy_process(), &fresh_state(), AccessibilityReading::untrusted());
        assert!((snap.raw_score - 0.40).abs() < 1e-9);
        assert!(!snap.raw_busy);
        assert_eq!(snap.confidence, Confidence::LowHeuristic);
    }

    #[test]
    fn all_signals_saturate_at_one() {
        let snap = engine().fuse(&busy_process(), &fresh_state(), AccessibilityReading::trusted(true));
        assert!(snap.raw_score <= 1.0);
        assert!((snap.raw_score - 1.0).abs() < 1e-9);
        assert_eq!(snap.confidence, Confidence::High);
    }

    #[test]
    fn score_is_monotonic_and_bounded() {
        let e = engine();
        for mask in 0u8..8 {
            let base = e.score(mask & 1 != 0, mask & 2 != 0, mask & 4 != 0);
            assert!((0.0..=1.0).contains(&base));
            for bit in 0..3 {
                let more = mask | (1 << bit);
                let raised = e.score(more & 1 != 0, more & 2 != 0, more & 4 != 0);
                assert!(raised >= base, "mask {:03b} -> {:03b}", mask, more);
            }
        }
    }

    #[test]
    fn process_busy_needs_pids_and_threshold() {
        let e = engine();
        let at_threshold = ProcessReading::new([5].into_iter().collect(), 8.0);
        let below = ProcessReading::new([5].into_iter().collect(), 7.99);
        let no_pids = ProcessReading { pids: Default::default(), cpu_percent: 50.0 };
        let missing = StateFileReading::missing();
        let ax = AccessibilityReading::untrusted();

        assert!(e.fuse(&at_threshold, &missing, ax).process_busy);
        assert!(!e.fuse(&below, &missing, ax).process_busy);
        assert!(!e.fuse(&no_pids, &missing, ax).process_busy);
    }

    #[test]
    fn freshness_window_is_inclusive() {
        let e = engine();
        let edge = StateFileReading { exists: true, age_seconds: Some(12.0), ..Default::default() };
        let stale = StateFileReading { exists: true, age_seconds: Some(12.01), ..Default::default() };
        let unknown_age = StateFileReading::unreadable();
        let p = ProcessReading::empty();
        let ax = AccessibilityReading::untrusted();

        assert!(e.fuse(&p, &edge, ax).state_fresh);
        assert!(!e.fuse(&p, &stale, ax).state_fresh);
        assert!(!e.fuse(&p, &unknown_age, ax).state_fresh);
    }

    #[test]
    fn untrusted_match_is_ignored() {
        let forged = AccessibilityReading { trusted: false, matched: true };
        let snap = engine().fuse(&ProcessReading::empty(), &StateFileReading::missing(), forged);
        assert!(!snap.accessibility_matched);
        assert_eq!(snap.raw_score, 0.0);
    }

    #[test]
    fn confidence_boundaries() {
        assert_eq!(confidence_for(0.75, false), Confidence::High);
        assert_eq!(confidence_for(0.749, true), Confidence::Medium);
        assert_eq!(confidence_for(0.749, false), Confidence::MediumHeuristic);
        assert_eq!(confidence_for(0.45, true), Confidence::Medium);
        assert_eq!(confidence_for(0.449, true), Confidence::Low);
        assert_eq!(confidence_for(0.449, false), Confidence::LowHeuristic);
        assert_eq!(confidence_for(0.0, false), Confidence::LowHeuristic);
    }

    #[test]
    fn confidence_does_not_drive_busy() {
        // Метка "high" при пороге 0.9 ещё не означает занятость
        let custom = FusionConfig { busy_score_threshold: 0.9, ..FusionConfig::default() };
        let e = SignalFusionEngine::with_params(custom, 8.0, 12.0);
        let snap = e.fuse(&busy_process(), &fresh_state(), AccessibilityReading::trusted(true));
        assert_eq!(snap.confidence, Confidence::High);
        assert!(snap.raw_busy);

        let snap = e.fuse(&ProcessReading::empty(), &fresh_state(), AccessibilityReading::trusted(true));
        assert_eq!(snap.confidence, Confidence::High);
        assert!(!snap.raw_busy);
    }
}
