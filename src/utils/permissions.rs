use crate::config::Config;
use crate::services::probes::CommandRunner;
use std::path::Path;
use tracing::{debug, info, warn};

const TRUST_CHECK_SCRIPT: &str = r#"tell application "System Events" to return UI elements enabled"#;

/// Есть ли у процесса право на чтение UI других приложений.
///
/// Отсутствие разрешения - штатный режим работы, поэтому любая ошибка даёт `false`.
pub async fn check_accessibility_trust(runner: &CommandRunner) -> bool {
    if !cfg!(target_os = "macos") {
        return false;
    }

    let args = vec!["-e".to_string(), TRUST_CHECK_SCRIPT.to_string()];
    match runner.run_checked("osascript", &args).await {
        Ok(stdout) => stdout.trim().eq_ignore_ascii_case("true"),
        Err(e) => {
            debug!("Проверка доступа к accessibility не удалась: {}", e);
            false
        }
    }
}

/// Проверить окружение, от которого зависят пробы. Ничего не блокирует, только предупреждает
pub async fn check_environment(config: &Config) {
    info!("Проверка окружения...");

    for tool in ["pgrep", "ps"] {
        if find_in_path(tool) {
            debug!("{} найден в PATH", tool);
        } else {
            warn!("{} не найден в PATH, сигнал процессов будет пустым", tool);
        }
    }

    let state_path = config.state_path();
    match state_path.parent() {
        Some(dir) if dir.is_dir() => info!("Каталог state-файла: {:?}", dir),
        _ => warn!(
            "Каталог state-файла {:?} не существует, сигнал свежести будет пустым",
            state_path
        ),
    }

    if !config.probe.accessibility_enabled {
        info!("Accessibility-проба отключена в конфигурации");
    } else if !cfg!(target_os = "macos") {
        warn!("Accessibility-проба доступна только на macOS, работаем по эвристикам");
    } else {
        let runner = CommandRunner::new(config.command_timeout());
        if check_accessibility_trust(&runner).await {
            info!("Доступ к accessibility подтвержден");
        } else {
            warn!("Нет доступа к accessibility, уверенность будет помечена как heuristic");
            for hint in get_setup_hints() {
                warn!("   {}", hint);
            }
        }
    }

    info!("Проверка окружения завершена");
}

fn find_in_path(tool: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| is_file(&dir.join(tool))))
        .unwrap_or(false)
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

/// Получить рекомендуемые шаги для выдачи разрешения accessibility
pub fn get_setup_hints() -> Vec<String> {
    vec![
        "# Выдать разрешение терминалу или бинарнику:".to_string(),
        "System Settings → Privacy & Security → Accessibility".to_string(),
        "".to_string(),
        "# Проверить разрешение вручную:".to_string(),
        format!("osascript -e '{}'", TRUST_CHECK_SCRIPT),
    ]
}
