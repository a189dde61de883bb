use super::r#trait::{AccessibilityProbe, ProcessProbe, StateFileProbe};
use crate::events::{AccessibilityReading, ProcessReading, StateFileReading, WorkspaceState};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// Один сценарий эмуляции
#[derive(Debug, Clone, PartialEq)]
pub struct DryRunScenario {
    pub name: &'static str,
    pub pids: Vec<u32>,
    pub cpu_percent: f64,
    pub state_age_seconds: Option<f64>,
    pub accessibility_trusted: bool,
    pub accessibility_matched: bool,
    pub active_roots: Vec<&'static str>,
}

/// Сценарии для режима сухого запуска; каждый длится `ticks_per_scenario` тиков
#[derive(Debug)]
pub struct DryRunScript {
    scenarios: Vec<DryRunScenario>,
    ticks_per_scenario: usize,
}

impl DryRunScenario {
    pub fn idle() -> Self {
        Self {
            name: "idle",
            pids: vec![],
            cpu_percent: 0.0,
            state_age_seconds: None,
            accessibility_trusted: false,
            accessibility_matched: false,
            active_roots: vec![],
        }
    }
}

impl DryRunScript {
    /// Пустой сценарий заменяется одним простаивающим
    pub fn new(mut scenarios: Vec<DryRunScenario>, ticks_per_scenario: usize) -> Arc<Self> {
        if scenarios.is_empty() {
            scenarios.push(DryRunScenario::idle());
        }
        Arc::new(Self {
            scenarios,
            ticks_per_scenario: ticks_per_scenario.max(1),
        })
    }

    pub fn default_cycle() -> Arc<Self> {
        let idle = DryRunScenario::idle();

        Self::new(
            vec![
                idle.clone(),
                DryRunScenario {
                    name: "background cpu",
                    pids: vec![4101, 4102],
                    cpu_percent: 12.0,
                    state_age_seconds: Some(40.0),
                    ..idle.clone()
                },
                DryRunScenario {
                    name: "heuristic busy",
                    pids: vec![4101, 4102],
                    cpu_percent: 35.0,
                    state_age_seconds: Some(1.5),
                    active_roots: vec!["/dry-run/alpha"],
                    ..idle.clone()
                },
                DryRunScenario {
                    name: "thinking",
                    pids: vec![4101, 4102, 4107],
                    cpu_percent: 48.0,
                    state_age_seconds: Some(0.5),
                    accessibility_trusted: true,
                    accessibility_matched: true,
                    active_roots: vec!["/dry-run/alpha"],
                    ..idle.clone()
                },
                DryRunScenario {
                    name: "settled",
                    pids: vec![4101],
                    cpu_percent: 1.0,
                    state_age_seconds: Some(20.0),
                    accessibility_trusted: true,
                    ..idle
                },
            ],
            3,
        )
    }

    pub fn scenario_at(&self, step: usize) -> &DryRunScenario {
        let index = (step / self.ticks_per_scenario) % self.scenarios.len();
        &self.scenarios[index]
    }

    fn workspaces_for(scenario: &DryRunScenario) -> WorkspaceState {
        let saved = vec!["/dry-run/alpha".to_string(), "/dry-run/beta".to_string()];
        let active: HashSet<String> = scenario.active_roots.iter().map(|r| r.to_string()).collect();
        let labels: HashMap<String, String> =
            [("/dry-run/beta".to_string(), "Beta (dry run)".to_string())]
                .into_iter()
                .collect();
        WorkspaceState::new(saved, active, labels)
    }
}

/// Каждая проба вызывается ровно раз за тик, поэтому собственные счётчики идут синхронно
struct Cursor {
    script: Arc<DryRunScript>,
    step: AtomicUsize,
}

impl Cursor {
    fn new(script: Arc<DryRunScript>) -> Self {
        Self {
            script,
            step: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> (usize, &DryRunScenario) {
        let step = self.step.fetch_add(1, Ordering::Relaxed);
        (step, self.script.scenario_at(step))
    }
}

pub struct DryRunProcessProbe {
    cursor: Cursor,
}

impl DryRunProcessProbe {
    pub fn new(script: Arc<DryRunScript>) -> Self {
        Self {
            cursor: Cursor::new(script),
        }
    }
}

#[async_trait::async_trait]
impl ProcessProbe for DryRunProcessProbe {
    async fn measure(&self) -> ProcessReading {
        let (step, scenario) = self.cursor.next();
        if step % self.cursor.script.ticks_per_scenario == 0 {
            info!("Dry-run: сценарий '{}'", scenario.name);
        }
        ProcessReading::new(scenario.pids.iter().copied().collect(), scenario.cpu_percent)
    }
}

pub struct DryRunStateFileProbe {
    cursor: Cursor,
}

impl DryRunStateFileProbe {
    pub fn new(script: Arc<DryRunScript>) -> Self {
        Self {
            cursor: Cursor::new(script),
        }
    }
}

#[async_trait::async_trait]
impl StateFileProbe for DryRunStateFileProbe {
    async fn read(&self) -> StateFileReading {
        let (_, scenario) = self.cursor.next();
        match scenario.state_age_seconds {
            Some(age) => StateFileReading {
                exists: true,
                age_seconds: Some(age),
                workspaces: DryRunScript::workspaces_for(scenario),
            },
            None => StateFileReading::missing(),
        }
    }
}

pub struct DryRunAccessibilityProbe {
    cursor: Cursor,
}

impl DryRunAccessibilityProbe {
    pub fn new(script: Arc<DryRunScript>) -> Self {
        Self {
            cursor: Cursor::new(script),
        }
    }
}

#[async_trait::async_trait]
impl AccessibilityProbe for DryRunAccessibilityProbe {
    async fn probe(&self) -> AccessibilityReading {
        let (_, scenario) = self.cursor.next();
        if scenario.accessibility_trusted {
            AccessibilityReading::trusted(scenario.accessibility_matched)
        } else {
            AccessibilityReading::untrusted()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenarios_repeat_for_configured_ticks() {
        let script = DryRunScript::default_cycle();
        assert_eq!(script.scenario_at(0).name, "idle");
        assert_eq!(script.scenario_at(2).name, "idle");
        assert_eq!(script.scenario_at(3).name, "background cpu");
        assert_eq!(script.scenario_at(15).name, "idle");
    }

    #[test]
    fn empty_script_stays_idle() {
        let script = DryRunScript::new(vec![], 0);
        assert_eq!(script.scenario_at(0).name, "idle");
        assert_eq!(script.scenario_at(41).name, "idle");
    }

    #[tokio::test]
    async fn probes_advance_in_lockstep() {
        let script = DryRunScript::new(
            vec![
                DryRunScenario {
                    name: "a",
                    pids: vec![],
                    cpu_percent: 0.0,
                    state_age_seconds: None,
                    accessibility_trusted: false,
                    accessibility_matched: false,
                    active_roots: vec![],
                },
                DryRunScenario {
                    name: "b",
                    pids: vec![1, 2],
                    cpu_percent: 9.0,
                    state_age_seconds: Some(2.0),
                    accessibility_trusted: true,
                    accessibility_matched: true,
                    active_roots: vec!["/dry-run/alpha"],
                },
            ],
            1,
        );
        let process = DryRunProcessProbe::new(script.clone());
        let state = DryRunStateFileProbe::new(script.clone());
        let ax = DryRunAccessibilityProbe::new(script);

        assert!(process.measure().await.pids.is_empty());
        assert!(!state.read().await.exists);
        assert_eq!(ax.probe().await, AccessibilityReading::untrusted());

        assert_eq!(process.measure().await.cpu_percent, 9.0);
        assert!(state.read().await.workspaces.active_roots.contains("/dry-run/alpha"));
        assert_eq!(ax.probe().await, AccessibilityReading::trusted(true));
    }
}
