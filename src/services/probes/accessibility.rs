use super::command::CommandRunner;
use super::r#trait::AccessibilityProbe;
use crate::config::Config;
use crate::error::Result;
use crate::events::AccessibilityReading;
use crate::utils::permissions::check_accessibility_trust;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

const LIST_INSTANCES_SCRIPT: &str = r#"
on run argv
  set appName to item 1 of argv
  set rowsOut to {}
  tell application "System Events"
    repeat with procRef in (every process whose name is appName)
      set end of rowsOut to ((unix id of procRef) as text) & tab & ((frontmost of procRef) as text)
    end repeat
  end tell
  set AppleScript's text item delimiters to linefeed
  set joined to rowsOut as text
  set AppleScript's text item delimiters to ""
  return joined
end run
"#;

// Обход в ширину с бюджетом узлов: одна строка на узел, поля через tab
const WALK_TREE_SCRIPT: &str = r#"
on sanitize(v)
  try
    set t to v as text
  on error
    set t to ""
  end try
  if t is "missing value" then set t to ""
  set AppleScript's text item delimiters to {return, linefeed, tab}
  set parts to text items of t
  set AppleScript's text item delimiters to " "
  set clean to parts as text
  set AppleScript's text item delimiters to ""
  return clean
end sanitize

on attr(nodeRef, attrName)
  try
    tell application "System Events" to set v to value of attribute attrName of nodeRef
    return my sanitize(v)
  on error
    return ""
  end try
end attr

on run argv
  set targetPid to (item 1 of argv) as integer
  set nodeBudget to (item 2 of argv) as integer
  set linesOut to {}
  tell application "System Events"
    set procRef to first process whose unix id is targetPid
    set queue to (windows of procRef) as list
  end tell
  set headIndex to 1
  repeat while headIndex <= (count of queue) and (count of linesOut) < nodeBudget
    set nodeRef to item headIndex of queue
    set headIndex to headIndex + 1
    set end of linesOut to my attr(nodeRef, "AXTitle") & tab & my attr(nodeRef, "AXValue") & tab & my attr(nodeRef, "AXDescription") & tab & my attr(nodeRef, "AXHelp")
    try
      tell application "System Events" to set childRefs to UI elements of nodeRef
      repeat with childRef in childRefs
        set end of queue to contents of childRef
      end repeat
    end try
  end repeat
  set AppleScript's text item delimiters to linefeed
  set joined to linesOut as text
  set AppleScript's text item delimiters to ""
  return joined
end run
"#;

/// Запущенный экземпляр целевого приложения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppInstance {
    pub pid: u32,
    pub frontmost: bool,
}

/// Текстовые атрибуты одного посещённого UI-элемента
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiNodeText {
    pub title: String,
    pub value: String,
    pub description: String,
    pub help: String,
}

/// Ищет ключевые слова занятости в тексте UI через System Events (osascript)
pub struct OsascriptAccessibilityProbe {
    runner: CommandRunner,
    enabled: bool,
    app_name: String,
    node_budget: usize,
    keywords: Vec<String>,
    walk_deadline: Duration,
}

impl OsascriptAccessibilityProbe {
    pub fn new(config: &Config) -> Self {
        Self {
            runner: CommandRunner::new(config.command_timeout()),
            enabled: config.probe.accessibility_enabled,
            app_name: config.probe.target_app_name.clone(),
            node_budget: config.probe.accessibility_node_budget,
            keywords: config.busy_keywords_lower().to_vec(),
            walk_deadline: config.accessibility_walk_deadline(),
        }
    }

    async fn list_instances(&self) -> Result<Vec<AppInstance>> {
        let stdout = self
            .runner
            .run_checked("osascript", &osascript_args(LIST_INSTANCES_SCRIPT, &[self.app_name.clone()]))
            .await?;
        Ok(parse_instance_rows(&stdout))
    }

    async fn collect_text(&self, pid: u32) -> Result<String> {
        let stdout = self
            .runner
            .run_checked(
                "osascript",
                &osascript_args(
                    WALK_TREE_SCRIPT,
                    &[pid.to_string(), self.node_budget.to_string()],
                ),
            )
            .await?;
        let nodes = parse_node_rows(&stdout, self.node_budget);
        Ok(flatten_text(&nodes))
    }

    async fn try_probe(&self) -> Result<bool> {
        let instances = self.list_instances().await?;
        let Some(pid) = select_instance(&instances) else {
            debug!("{} не запущен, accessibility-сигнал пуст", self.app_name);
            return Ok(false);
        };

        let text = self.collect_text(pid).await?;
        if text.is_empty() {
            return Ok(false);
        }
        Ok(contains_busy_keyword(&text, &self.keywords))
    }
}

#[async_trait::async_trait]
impl AccessibilityProbe for OsascriptAccessibilityProbe {
    async fn probe(&self) -> AccessibilityReading {
        if !self.enabled || !cfg!(target_os = "macos") {
            return AccessibilityReading::untrusted();
        }

        // Без разрешения обход не выполняется вовсе
        if !check_accessibility_trust(&self.runner).await {
            return AccessibilityReading::untrusted();
        }

        walk_within(self.walk_deadline, self.try_probe()).await
    }
}

/// После подтверждённого разрешения любой сбой обхода даёт только `matched = false`
async fn walk_within<F>(deadline: Duration, walk: F) -> AccessibilityReading
where
    F: Future<Output = Result<bool>>,
{
    match timeout(deadline, walk).await {
        Ok(Ok(matched)) => AccessibilityReading::trusted(matched),
        Ok(Err(e)) => {
            debug!("Accessibility-проба деградировала: {}", e);
            AccessibilityReading::trusted(false)
        }
        Err(_) => {
            debug!("Обход UI не уложился в {:?}", deadline);
            AccessibilityReading::trusted(false)
        }
    }
}

fn osascript_args(script: &str, args: &[String]) -> Vec<String> {
    let mut out = vec!["-e".to_string(), script.to_string()];
    if !args.is_empty() {
        out.push("--".to_string());
        out.extend(args.iter().cloned());
    }
    out
}

/// Строки вида `pid<TAB>true|false`
pub fn parse_instance_rows(stdout: &str) -> Vec<AppInstance> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().split('\t');
            let pid = fields.next()?.trim().parse::<u32>().ok()?;
            let frontmost = fields
                .next()
                .map(|f| f.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            Some(AppInstance { pid, frontmost })
        })
        .collect()
}

/// Активный экземпляр в приоритете, затем больший pid
pub fn select_instance(instances: &[AppInstance]) -> Option<u32> {
    instances
        .iter()
        .max_by_key(|instance| (instance.frontmost, instance.pid))
        .map(|instance| instance.pid)
}

/// Разбирает строки обхода; лишние строки сверх бюджета отбрасываются
pub fn parse_node_rows(stdout: &str, node_budget: usize) -> Vec<UiNodeText> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(node_budget)
        .map(|line| {
            let mut fields = line.split('\t').map(|f| f.trim().to_string());
            UiNodeText {
                title: fields.next().unwrap_or_default(),
                value: fields.next().unwrap_or_default(),
                description: fields.next().unwrap_or_default(),
                help: fields.next().unwrap_or_default(),
            }
        })
        .collect()
}

/// Склеивает все непустые строки узлов в один текст в нижнем регистре
pub fn flatten_text(nodes: &[UiNodeText]) -> String {
    nodes
        .iter()
        .flat_map(|node| [&node.title, &node.value, &node.description, &node.help])
        .filter(|text| !text.is_empty())
        .map(|text| text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `text` и `keywords` ожидаются уже в нижнем регистре
pub fn contains_busy_keyword(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_rows_are_parsed() {
        let rows = parse_instance_rows("501\tfalse\n730\ttrue\njunk\n12\n");
        assert_eq!(
            rows,
            vec![
                AppInstance { pid: 501, frontmost: false },
                AppInstance { pid: 730, frontmost: true },
                AppInstance { pid: 12, frontmost: false },
            ]
        );
    }

    #[test]
    fn frontmost_instance_wins_over_higher_pid() {
        let instances = [
            AppInstance { pid: 900, frontmost: false },
            AppInstance { pid: 300, frontmost: true },
        ];
        assert_eq!(select_instance(&instances), Some(300));
    }

    #[test]
    fn higher_pid_breaks_ties() {
        let instances = [
            AppInstance { pid: 410, frontmost: false },
            AppInstance { pid: 977, frontmost: false },
        ];
        assert_eq!(select_instance(&instances), Some(977));
        assert_eq!(select_instance(&[]), None);
    }

    #[test]
    fn node_rows_respect_budget() {
        let raw = "Window\t\t\t\n\tThinking…\t\t\nButton\t\tStop\tStops the run\n";
        let nodes = parse_node_rows(raw, 2);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].value, "Thinking…");
    }

    #[test]
    fn flattened_text_is_lowercase_and_matches_keywords() {
        let nodes = parse_node_rows("Codex\tRunning tests\t\t\nSend\t\t\tSend message\n", 300);
        let text = flatten_text(&nodes);
        assert_eq!(text, "codex running tests send send message");

        let keywords = Config::default().busy_keywords_lower().to_vec();
        assert!(contains_busy_keyword(&text, &keywords));
        assert!(!contains_busy_keyword("ready for input", &keywords));
        assert!(contains_busy_keyword("task in progress", &keywords));
    }

    #[test]
    fn osascript_args_separate_script_arguments() {
        let args = osascript_args("return 1", &["Codex".to_string()]);
        assert_eq!(args, vec!["-e", "return 1", "--", "Codex"]);
    }

    #[tokio::test]
    async fn slow_walk_keeps_trust() {
        let reading = walk_within(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Result::<bool>::Ok(true)
        })
        .await;
        assert_eq!(reading, AccessibilityReading::trusted(false));
    }

    #[tokio::test]
    async fn failed_walk_keeps_trust() {
        let reading = walk_within(Duration::from_secs(1), async {
            crate::error::PulseError::probe::<bool>("osascript завершился с кодом 1")
        })
        .await;
        assert_eq!(reading, AccessibilityReading::trusted(false));

        let reading = walk_within(Duration::from_secs(1), async { Result::<bool>::Ok(true) }).await;
        assert_eq!(reading, AccessibilityReading::trusted(true));
    }

    #[tokio::test]
    async fn disabled_probe_is_untrusted() {
        let mut config = Config::default();
        config.probe.accessibility_enabled = false;
        let probe = OsascriptAccessibilityProbe::new(&config);
        assert_eq!(probe.probe().await, AccessibilityReading::untrusted());
    }
}
