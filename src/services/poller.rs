use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{
    AccessibilityReading, ActivitySnapshot, DiagnosticsReport, ProcessReading, Scope,
    StateFileReading,
};
use crate::services::activity_context::ActivityContext;
use crate::services::fusion::SignalFusionEngine;
use crate::services::hysteresis::HysteresisFilter;
use crate::services::probes::ProbeSet;
use crate::services::scope::ScopeProjector;

/// Единственный писатель состояния активности.
///
/// Владеет движком слияния и фильтром гистерезиса; тики идут строго
/// последовательно, следующий не начинается до публикации предыдущего.
pub struct Poller {
    probes: ProbeSet,
    fusion: SignalFusionEngine,
    hysteresis: HysteresisFilter,
    context: Arc<dyn ActivityContext>,
    interval: Duration,
    probe_deadline: Duration,
    tick: u64,
    // Последнее известное разрешение accessibility, для пробы, не уложившейся в срок
    accessibility_trusted: bool,

    // Для диагностического экспорта
    state_path: PathBuf,
    cpu_busy_threshold: f64,
    scope: Scope,
    style: String,
}

impl Poller {
    pub fn new(config: &Config, probes: ProbeSet, context: Arc<dyn ActivityContext>) -> Self {
        info!(
            "Инициализация Poller: интервал {:?}, порог CPU {}%, сэмплов для переключения {}",
            config.poll_interval(),
            config.probe.process_cpu_busy_threshold,
            config.hysteresis.samples_required_to_flip
        );

        Self {
            probes,
            fusion: SignalFusionEngine::new(config),
            hysteresis: HysteresisFilter::new(config.hysteresis.samples_required_to_flip),
            context,
            interval: config.poll_interval(),
            probe_deadline: config.probe_deadline(),
            tick: 0,
            accessibility_trusted: false,
            state_path: config.state_path(),
            cpu_busy_threshold: config.probe.process_cpu_busy_threshold,
            scope: config.display.scope.clone(),
            style: config.display.style.clone(),
        }
    }

    pub fn hysteresis(&self) -> &HysteresisFilter {
        &self.hysteresis
    }

    /// Один тик: пробы параллельно, затем слияние, гистерезис и публикация
    pub async fn tick(&mut self) -> Arc<ActivitySnapshot> {
        let deadline = self.probe_deadline;
        let last_trusted = self.accessibility_trusted;
        let (process, state_file, accessibility) = tokio::join!(
            bounded(deadline, "process", self.probes.process.measure(), ProcessReading::empty),
            bounded(deadline, "state_file", self.probes.state_file.read(), StateFileReading::missing),
            bounded(
                deadline,
                "accessibility",
                self.probes.accessibility.probe(),
                || if last_trusted {
                    AccessibilityReading::trusted(false)
                } else {
                    AccessibilityReading::untrusted()
                }
            ),
        );
        self.accessibility_trusted = accessibility.trusted;

        let signals = self.fusion.fuse(&process, &state_file, accessibility);
        let previous = self.hysteresis.stable_busy();
        let stable_busy = self.hysteresis.apply(signals.raw_busy);
        self.tick += 1;

        let snapshot = Arc::new(ActivitySnapshot::new(
            self.tick,
            signals,
            stable_busy,
            state_file.workspaces,
        ));

        debug_if_enabled!(
            "Тик {} (прогресс к переключению {}/{})",
            snapshot,
            self.hysteresis.consecutive_contrary_count(),
            self.hysteresis.samples_required_to_flip()
        );

        if stable_busy != previous {
            info!(
                "Стабильное состояние: {} -> {} (score {:.2}, {})",
                state_name(previous),
                state_name(stable_busy),
                snapshot.signals.raw_score,
                snapshot.signals.confidence
            );
            for row in ScopeProjector::rows(&snapshot.workspaces, stable_busy) {
                debug!("  {} ({}): {}", row.label, row.root, state_name(row.busy));
            }
            if tracing::enabled!(tracing::Level::DEBUG) {
                if let Ok(json) = self.diagnostics(&snapshot).to_json_pretty() {
                    debug!("Диагностика: {}", json);
                }
            }
        }

        self.context.publish(snapshot.clone());
        snapshot
    }

    pub fn diagnostics(&self, snapshot: &ActivitySnapshot) -> DiagnosticsReport {
        DiagnosticsReport::new(
            snapshot,
            &self.state_path,
            self.cpu_busy_threshold,
            &self.scope,
            &self.style,
        )
    }

    pub async fn run(mut self) -> Result<()> {
        info!("Poller запущен");

        let mut ticker = interval(self.interval);
        // Пропущенные тики не догоняются пачкой
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        info!("Poller завершает работу после {} тиков", self.tick);
    }
}

/// Проба, не уложившаяся в срок, деградирует к значению по умолчанию
async fn bounded<T, F, D>(deadline: Duration, name: &str, probe: F, fallback: D) -> T
where
    F: Future<Output = T>,
    D: FnOnce() -> T,
{
    match timeout(deadline, probe).await {
        Ok(reading) => reading,
        Err(_) => {
            debug!("Проба {} не уложилась в {:?}, используем значение по умолчанию", name, deadline);
            fallback()
        }
    }
}

fn state_name(busy: bool) -> &'static str {
    if busy {
        "busy"
    } else {
        "dormant"
    }
}
