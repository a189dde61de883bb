use std::fmt;
use std::time::SystemTime;

use super::signals::SignalSnapshot;
use super::workspace::WorkspaceState;

/// Зафиксированное состояние после тика: сигналы, стабильный флаг и рабочие области.
///
/// Создаётся только опросчиком; потребители получают его через `Arc` и не блокируют тик.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySnapshot {
    /// Номер тика, 0 до первого опроса
    pub tick: u64,
    pub captured_at: SystemTime,
    pub signals: SignalSnapshot,
    pub stable_busy: bool,
    pub workspaces: WorkspaceState,
}

impl ActivitySnapshot {
    pub fn initial() -> Self {
        Self {
            tick: 0,
            captured_at: SystemTime::now(),
            signals: SignalSnapshot::default(),
            stable_busy: false,
            workspaces: WorkspaceState::default(),
        }
    }

    pub fn new(
        tick: u64,
        signals: SignalSnapshot,
        stable_busy: bool,
        workspaces: WorkspaceState,
    ) -> Self {
        Self {
            tick,
            captured_at: SystemTime::now(),
            signals,
            stable_busy,
            workspaces,
        }
    }
}

impl fmt::Display for ActivitySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} stable={}",
            self.tick,
            self.signals,
            if self.stable_busy { "busy" } else { "dormant" }
        )
    }
}
