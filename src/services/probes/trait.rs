use super::dry_run::{
    DryRunAccessibilityProbe, DryRunProcessProbe, DryRunScript, DryRunStateFileProbe,
};
use crate::config::Config;
use crate::events::{AccessibilityReading, ProcessReading, StateFileReading};
use std::sync::Arc;

/// Проба процессов целевого приложения.
///
/// Никогда не возвращает ошибку: любой сбой ОС даёт пустое показание.
#[async_trait::async_trait]
pub trait ProcessProbe: Send + Sync {
    async fn measure(&self) -> ProcessReading;
}

/// Проба общего JSON state-файла целевого приложения
#[async_trait::async_trait]
pub trait StateFileProbe: Send + Sync {
    async fn read(&self) -> StateFileReading;
}

/// Проба текста UI через accessibility; без разрешения всегда `untrusted`
#[async_trait::async_trait]
pub trait AccessibilityProbe: Send + Sync {
    async fn probe(&self) -> AccessibilityReading;
}

/// Три независимые пробы одного тика
pub struct ProbeSet {
    pub process: Box<dyn ProcessProbe>,
    pub state_file: Box<dyn StateFileProbe>,
    pub accessibility: Box<dyn AccessibilityProbe>,
}

impl ProbeSet {
    /// Все три пробы читают один и тот же сценарий
    pub fn scripted(script: Arc<DryRunScript>) -> Self {
        Self {
            process: Box::new(DryRunProcessProbe::new(script.clone())),
            state_file: Box::new(DryRunStateFileProbe::new(script.clone())),
            accessibility: Box::new(DryRunAccessibilityProbe::new(script)),
        }
    }
}

/// Factory function to create real or scripted probes based on the dry_run flag
pub fn create_probes(config: Arc<Config>, dry_run: bool) -> ProbeSet {
    if dry_run {
        ProbeSet::scripted(DryRunScript::default_cycle())
    } else {
        ProbeSet {
            process: Box::new(super::process::PgrepProcessProbe::new(&config)),
            state_file: Box::new(super::state_file::JsonStateFileProbe::new(config.state_path())),
            accessibility: Box::new(super::accessibility::OsascriptAccessibilityProbe::new(&config)),
        }
    }
}
