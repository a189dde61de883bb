use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::workspace::WorkspaceState;

/// Показание пробы процессов за один тик
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReading {
    pub pids: BTreeSet<u32>,
    pub cpu_percent: f64,
}

impl ProcessReading {
    pub fn new(pids: BTreeSet<u32>, cpu_percent: f64) -> Self {
        // Без процессов CPU не имеет смысла
        let cpu_percent = if pids.is_empty() { 0.0 } else { cpu_percent.max(0.0) };
        Self { pids, cpu_percent }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Показание state-файла: существование, возраст и список рабочих областей
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateFileReading {
    pub exists: bool,
    pub age_seconds: Option<f64>,
    pub workspaces: WorkspaceState,
}

impl StateFileReading {
    pub fn missing() -> Self {
        Self::default()
    }

    /// Файл есть, но прочитать его не удалось: возраст и области отбрасываются
    pub fn unreadable() -> Self {
        Self {
            exists: true,
            ..Self::default()
        }
    }
}

/// Показание accessibility-пробы
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessibilityReading {
    pub trusted: bool,
    pub matched: bool,
}

impl AccessibilityReading {
    pub fn untrusted() -> Self {
        Self {
            trusted: false,
            matched: false,
        }
    }

    pub fn trusted(matched: bool) -> Self {
        Self {
            trusted: true,
            matched,
        }
    }
}

/// Метка уверенности, только для отображения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Confidence {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "medium (heuristic)")]
    MediumHeuristic,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "low (heuristic)")]
    LowHeuristic,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::MediumHeuristic => "medium (heuristic)",
            Confidence::Low => "low",
            Confidence::LowHeuristic => "low (heuristic)",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Неизменяемый результат одного тика слияния сигналов
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSnapshot {
    pub target_process_ids: BTreeSet<u32>,
    pub process_cpu_percent: f64,
    pub process_busy: bool,
    pub state_file_exists: bool,
    pub state_file_age_seconds: Option<f64>,
    pub state_fresh: bool,
    pub accessibility_trusted: bool,
    pub accessibility_matched: bool,
    pub raw_score: f64,
    pub confidence: Confidence,
    pub raw_busy: bool,
}

impl Default for SignalSnapshot {
    fn default() -> Self {
        Self {
            target_process_ids: BTreeSet::new(),
            process_cpu_percent: 0.0,
            process_busy: false,
            state_file_exists: false,
            state_file_age_seconds: None,
            state_fresh: false,
            accessibility_trusted: false,
            accessibility_matched: false,
            raw_score: 0.0,
            confidence: Confidence::LowHeuristic,
            raw_busy: false,
        }
    }
}

impl fmt::Display for SignalSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score={:.2} ({}) raw_busy={} pids={} cpu={:.1}% fresh={} ax={}/{}",
            self.raw_score,
            self.confidence,
            self.raw_busy,
            self.target_process_ids.len(),
            self.process_cpu_percent,
            self.state_fresh,
            self.accessibility_trusted,
            self.accessibility_matched,
        )
    }
}
