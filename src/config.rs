use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::events::Scope;
use crate::services::indicator::IndicatorStyle;

/// `<home>/.codex/.codex-global-state.json`
/// Сколько внешних команд максимум выполняет одна проба (trust, список экземпляров, обход)
pub const MAX_COMMANDS_PER_PROBE: u64 = 3;

/// Запас между внутренним сроком пробы и сроком тика в Poller
const PROBE_DEADLINE_SLACK_MS: u64 = 250;

static DEFAULT_STATE_PATH: Lazy<PathBuf> = Lazy::new(|| {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".codex")
        .join(".codex-global-state.json")
});

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub probe: ProbeConfig,
    pub fusion: FusionConfig,
    pub hysteresis: HysteresisConfig,
    pub poller: PollerConfig,
    pub display: DisplayConfig,
    // Оптимизационный индекс - не сериализуется, строится после загрузки
    #[serde(skip)]
    busy_keywords_lower: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Имя приложения для System Events
    pub target_app_name: String,
    /// Фрагменты путей исполняемого файла, фреймворков и хелперов
    pub process_patterns: Vec<String>,
    pub process_cpu_busy_threshold: f64,
    pub command_timeout_ms: u64,
    pub state_path: Option<PathBuf>,
    pub state_freshness_window_secs: f64,
    pub accessibility_enabled: bool,
    pub accessibility_node_budget: usize,
    pub busy_keywords: Vec<String>,
}

/// Веса сигналов и порог занятости; значения по умолчанию - поведенческий паритет
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FusionConfig {
    pub accessibility_weight: f64,
    pub process_weight: f64,
    pub state_weight: f64,
    pub busy_score_threshold: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct HysteresisConfig {
    pub samples_required_to_flip: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_ms: u64,
    /// Жёсткий предел на одну пробу внутри тика
    pub probe_deadline_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub scope: Scope,
    pub style: String,
    pub frame_interval_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target_app_name: "Codex".to_string(),
            process_patterns: vec![
                "Codex.app/Contents/MacOS/".to_string(),
                "Codex.app/Contents/Frameworks/".to_string(),
                "Codex Helper".to_string(),
            ],
            process_cpu_busy_threshold: 8.0,
            command_timeout_ms: 1500,
            state_path: None,
            state_freshness_window_secs: 12.0,
            accessibility_enabled: true,
            accessibility_node_budget: 300,
            busy_keywords: [
                "thinking",
                "running",
                "in progress",
                "working",
                "generating",
                "streaming",
                "applying",
                "executing",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            accessibility_weight: 0.60,
            process_weight: 0.25,
            state_weight: 0.15,
            busy_score_threshold: 0.60,
        }
    }
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            samples_required_to_flip: 2,
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2500,
            probe_deadline_ms: 5000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            scope: Scope::All,
            style: "dots".to_string(),
            frame_interval_ms: 200,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            logging: LoggingConfig::default(),
            probe: ProbeConfig::default(),
            fusion: FusionConfig::default(),
            hysteresis: HysteresisConfig::default(),
            poller: PollerConfig::default(),
            display: DisplayConfig::default(),
            busy_keywords_lower: Vec::new(),
        };
        config.build_optimization_indexes();
        config
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        // Отсутствующий файл не ошибка: остаются значения по умолчанию
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("CODEX_PULSE_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        config.build_optimization_indexes();

        Ok(config)
    }

    /// Предварительно нормализует ключевые слова для поиска по тексту UI
    pub fn build_optimization_indexes(&mut self) {
        self.busy_keywords_lower = self
            .probe
            .busy_keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.probe.process_patterns.iter().all(|p| p.trim().is_empty()) {
            anyhow::bail!("process_patterns не должен быть пустым");
        }

        if !(self.probe.process_cpu_busy_threshold >= 0.0) {
            anyhow::bail!("process_cpu_busy_threshold должен быть неотрицательным");
        }

        if !(self.probe.state_freshness_window_secs >= 0.0) {
            anyhow::bail!("state_freshness_window_secs должен быть неотрицательным");
        }

        if self.probe.command_timeout_ms == 0 {
            anyhow::bail!("command_timeout_ms должно быть больше 0");
        }

        if self.probe.accessibility_node_budget == 0 {
            anyhow::bail!("accessibility_node_budget должно быть больше 0");
        }

        let weights = [
            ("accessibility_weight", self.fusion.accessibility_weight),
            ("process_weight", self.fusion.process_weight),
            ("state_weight", self.fusion.state_weight),
            ("busy_score_threshold", self.fusion.busy_score_threshold),
        ];
        for (name, value) in weights {
            if !(value >= 0.0) {
                anyhow::bail!("{} должен быть неотрицательным, получено {}", name, value);
            }
        }

        if self.hysteresis.samples_required_to_flip == 0 {
            anyhow::bail!("samples_required_to_flip должно быть больше 0");
        }

        if self.poller.interval_ms < 250 {
            anyhow::bail!("interval_ms должно быть минимум 250");
        }

        let worst_case_ms = self.probe.command_timeout_ms * MAX_COMMANDS_PER_PROBE + PROBE_DEADLINE_SLACK_MS;
        if self.poller.probe_deadline_ms < worst_case_ms {
            anyhow::bail!(
                "probe_deadline_ms ({}) меньше худшего времени пробы: {} команды по {} мс + {} мс запаса",
                self.poller.probe_deadline_ms,
                MAX_COMMANDS_PER_PROBE,
                self.probe.command_timeout_ms,
                PROBE_DEADLINE_SLACK_MS
            );
        }

        if self.display.frame_interval_ms == 0 {
            anyhow::bail!("frame_interval_ms должно быть больше 0");
        }

        if IndicatorStyle::by_id(&self.display.style).is_none() {
            anyhow::bail!(
                "Неизвестный стиль индикатора '{}', доступны: {}",
                self.display.style,
                IndicatorStyle::ids().join(", ")
            );
        }

        Ok(())
    }

    /// Переопределения из командной строки поверх файла и окружения
    pub fn apply_cli_overrides(
        &mut self,
        log_level: Option<String>,
        scope: Option<Scope>,
        style: Option<String>,
    ) {
        if let Some(level) = log_level {
            self.logging.level = level;
        }
        if let Some(scope) = scope {
            self.display.scope = scope;
        }
        if let Some(style) = style {
            self.display.style = style;
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.probe
            .state_path
            .clone()
            .unwrap_or_else(|| DEFAULT_STATE_PATH.clone())
    }

    pub fn busy_keywords_lower(&self) -> &[String] {
        &self.busy_keywords_lower
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poller.interval_ms)
    }

    pub fn probe_deadline(&self) -> Duration {
        Duration::from_millis(self.poller.probe_deadline_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.probe.command_timeout_ms)
    }

    /// Срок на поиск экземпляра и обход UI после проверки разрешения.
    /// Истекает раньше срока тика, поэтому проба успевает сообщить `trusted`.
    pub fn accessibility_walk_deadline(&self) -> Duration {
        self.probe_deadline().saturating_sub(Duration::from_millis(
            self.probe.command_timeout_ms + PROBE_DEADLINE_SLACK_MS,
        ))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.display.frame_interval_ms)
    }
}
