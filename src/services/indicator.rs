use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::config::Config;
use crate::error::{PulseError, Result};
use crate::events::Scope;
use crate::services::activity_context::ActivityContext;
use crate::services::scope::ScopeProjector;

/// Набор глифов индикатора
#[derive(Debug, PartialEq, Eq)]
pub struct IndicatorStyle {
    pub id: &'static str,
    pub running_frames: &'static [&'static str],
    pub dormant_glyph: &'static str,
}

pub const STYLES: &[IndicatorStyle] = &[
    IndicatorStyle {
        id: "dots",
        running_frames: &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
        dormant_glyph: "⠿",
    },
    IndicatorStyle {
        id: "pulse",
        running_frames: &["◐", "◓", "◑", "◒"],
        dormant_glyph: "○",
    },
    IndicatorStyle {
        id: "bars",
        running_frames: &["▁", "▃", "▅", "▇", "▅", "▃"],
        dormant_glyph: "▁",
    },
    IndicatorStyle {
        id: "classic",
        running_frames: &["|", "/", "-", "\\"],
        dormant_glyph: ".",
    },
];

impl IndicatorStyle {
    pub fn by_id(id: &str) -> Option<&'static IndicatorStyle> {
        STYLES.iter().find(|style| style.id == id)
    }

    pub fn ids() -> Vec<&'static str> {
        STYLES.iter().map(|style| style.id).collect()
    }

    pub fn frame(&self, busy: bool, frame_tick: u64) -> &'static str {
        if !busy || self.running_frames.is_empty() {
            return self.dormant_glyph;
        }
        let index = (frame_tick % self.running_frames.len() as u64) as usize;
        self.running_frames[index]
    }
}

/// Строка состояния в терминале.
///
/// Свой, более частый таймер; читает только зафиксированный снимок и не запускает пробы.
pub struct StatusRenderer {
    context: Arc<dyn ActivityContext>,
    style: &'static IndicatorStyle,
    scope: Scope,
    frame_interval: Duration,
}

impl StatusRenderer {
    pub fn new(config: &Config, context: Arc<dyn ActivityContext>) -> Result<Self> {
        let style = IndicatorStyle::by_id(&config.display.style).ok_or_else(|| {
            PulseError::Config(format!("стиль '{}' не найден", config.display.style))
        })?;

        Ok(Self {
            context,
            style,
            scope: config.display.scope.clone(),
            frame_interval: config.frame_interval(),
        })
    }

    pub fn render_line(&self, frame_tick: u64) -> String {
        let snapshot = self.context.latest();
        // Один снимок на кадр, чтобы флаг и метка не разошлись между публикациями
        let busy = ScopeProjector::project(
            &self.scope,
            snapshot.stable_busy,
            &snapshot.workspaces.active_roots,
        );
        let scope_label = match &self.scope {
            Scope::All => "all workspaces".to_string(),
            Scope::Workspace(root) => snapshot.workspaces.label_for(root),
        };

        format!(
            "{} Codex {} [{}] {}",
            self.style.frame(busy, frame_tick),
            if busy { "busy" } else { "idle" },
            scope_label,
            snapshot.signals.confidence,
        )
    }

    pub async fn run(self) -> Result<()> {
        debug!("StatusRenderer запущен: стиль '{}', область '{}'", self.style.id, self.scope);

        let mut ticker = interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frame_tick: u64 = 0;

        loop {
            ticker.tick().await;

            let line = self.render_line(frame_tick);
            let mut stderr = std::io::stderr().lock();
            write!(stderr, "\r{}\x1b[K", line)?;
            stderr.flush()?;

            frame_tick = frame_tick.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ActivitySnapshot, SignalSnapshot, WorkspaceState};
    use crate::services::activity_context::DefaultActivityContext;

    #[test]
    fn styles_are_found_by_id() {
        assert_eq!(IndicatorStyle::by_id("pulse").unwrap().dormant_glyph, "○");
        assert!(IndicatorStyle::by_id("nope").is_none());
        assert_eq!(IndicatorStyle::ids(), vec!["dots", "pulse", "bars", "classic"]);
    }

    #[test]
    fn frames_cycle_only_while_busy() {
        let style = IndicatorStyle::by_id("classic").unwrap();
        let frames: Vec<&str> = (0..5).map(|t| style.frame(true, t)).collect();
        assert_eq!(frames, vec!["|", "/", "-", "\\", "|"]);
        assert_eq!(style.frame(false, 3), ".");
    }

    #[test]
    fn unknown_style_is_a_config_error() {
        let mut config = Config::default();
        config.display.style = "sparkles".into();
        let context: Arc<dyn ActivityContext> = Arc::new(DefaultActivityContext::new());
        assert!(matches!(
            StatusRenderer::new(&config, context),
            Err(PulseError::Config(_))
        ));
    }

    #[test]
    fn render_line_reads_committed_snapshot() {
        let context: Arc<dyn ActivityContext> = Arc::new(DefaultActivityContext::new());
        let mut config = Config::default();
        config.display.style = "classic".into();
        config.display.scope = Scope::Workspace("/work/alpha".into());
        let renderer = StatusRenderer::new(&config, context.clone()).unwrap();

        assert_eq!(renderer.render_line(0), ". Codex idle [alpha] low (heuristic)");

        let workspaces = WorkspaceState::new(
            vec!["/work/alpha".into()],
            ["/work/alpha".to_string()].into_iter().collect(),
            Default::default(),
        );
        let signals = SignalSnapshot {
            confidence: crate::events::Confidence::High,
            ..SignalSnapshot::default()
        };
        context.publish(Arc::new(ActivitySnapshot::new(3, signals, true, workspaces)));
        assert_eq!(renderer.render_line(1), "/ Codex busy [alpha] high");
    }
}
