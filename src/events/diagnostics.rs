use serde::Serialize;
use std::path::Path;

use super::activity::ActivitySnapshot;
use super::signals::Confidence;
use super::workspace::Scope;
use crate::error::Result;

/// Запись для копирования в буфер обмена при обращении в поддержку
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    pub state_path: String,
    pub state_file_exists: bool,
    pub state_file_age_seconds: Option<f64>,
    pub state_fresh_signal: bool,
    pub codex_pids: Vec<u32>,
    pub codex_pid_count: usize,
    pub process_cpu_percent: f64,
    pub process_busy_threshold_percent: f64,
    pub process_busy_signal: bool,
    pub accessibility_trusted: bool,
    pub accessibility_signal: bool,
    pub raw_score: f64,
    pub confidence: Confidence,
    pub stable_busy_state: bool,
    pub scope: String,
    pub style: String,
}

impl DiagnosticsReport {
    pub fn new(
        snapshot: &ActivitySnapshot,
        state_path: &Path,
        process_busy_threshold_percent: f64,
        scope: &Scope,
        style: &str,
    ) -> Self {
        let signals = &snapshot.signals;
        // BTreeSet уже отсортирован
        let codex_pids: Vec<u32> = signals.target_process_ids.iter().copied().collect();

        Self {
            state_path: state_path.display().to_string(),
            state_file_exists: signals.state_file_exists,
            state_file_age_seconds: signals.state_file_age_seconds,
            state_fresh_signal: signals.state_fresh,
            codex_pid_count: codex_pids.len(),
            codex_pids,
            process_cpu_percent: signals.process_cpu_percent,
            process_busy_threshold_percent,
            process_busy_signal: signals.process_busy,
            accessibility_trusted: signals.accessibility_trusted,
            accessibility_signal: signals.accessibility_matched,
            raw_score: signals.raw_score,
            confidence: signals.confidence,
            stable_busy_state: snapshot.stable_busy,
            scope: scope.to_string(),
            style: style.to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::signals::SignalSnapshot;
    use crate::events::workspace::WorkspaceState;

    fn snapshot() -> ActivitySnapshot {
        let signals = SignalSnapshot {
            target_process_ids: [912, 77].into_iter().collect(),
            process_cpu_percent: 12.0,
            process_busy: true,
            raw_score: 0.25,
            confidence: Confidence::LowHeuristic,
            ..SignalSnapshot::default()
        };
        ActivitySnapshot::new(2, signals, false, WorkspaceState::default())
    }

    #[test]
    fn report_exposes_every_documented_field() {
        let report = DiagnosticsReport::new(
            &snapshot(),
            Path::new("/home/u/.codex/.codex-global-state.json"),
            8.0,
            &Scope::All,
            "dots",
        );
        let value = serde_json::to_value(&report).unwrap();
        let object = value.as_object().unwrap();

        let expected = [
            "state_path",
            "state_file_exists",
            "state_file_age_seconds",
            "state_fresh_signal",
            "codex_pids",
            "codex_pid_count",
            "process_cpu_percent",
            "process_busy_threshold_percent",
            "process_busy_signal",
            "accessibility_trusted",
            "accessibility_signal",
            "raw_score",
            "confidence",
            "stable_busy_state",
            "scope",
            "style",
        ];
        assert_eq!(object.len(), expected.len());
        for key in expected {
            assert!(object.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn report_values_follow_snapshot() {
        let report = DiagnosticsReport::new(
            &snapshot(),
            Path::new("/s.json"),
            8.0,
            &Scope::Workspace("/work/a".into()),
            "pulse",
        );
        assert_eq!(report.codex_pids, vec![77, 912]);
        assert_eq!(report.codex_pid_count, 2);
        assert_eq!(report.state_file_age_seconds, None);

        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["confidence"], "low (heuristic)");
        assert_eq!(json["scope"], "/work/a");
        assert_eq!(json["state_file_age_seconds"], serde_json::Value::Null);
    }
}
