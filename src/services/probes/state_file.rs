use super::r#trait::StateFileProbe;
use crate::error::Result;
use crate::pulse_error;
use crate::events::{StateFileReading, WorkspaceState};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

pub const SAVED_ROOTS_KEY: &str = "electron-saved-workspace-roots";
pub const ACTIVE_ROOTS_KEY: &str = "active-workspace-roots";
pub const ROOT_LABELS_KEY: &str = "electron-workspace-root-labels";

/// Читает `.codex-global-state.json`; файл только читается, никогда не пишется
pub struct JsonStateFileProbe {
    path: PathBuf,
}

impl JsonStateFileProbe {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl StateFileProbe for JsonStateFileProbe {
    async fn read(&self) -> StateFileReading {
        read_state_file(&self.path, SystemTime::now())
    }
}

/// Читает state-файл относительно момента `now`. Ошибки не пробрасываются
pub fn read_state_file(path: &Path, now: SystemTime) -> StateFileReading {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return StateFileReading::missing(),
        Err(e) => {
            debug!("Не удалось получить метаданные {:?}: {}", path, e);
            return StateFileReading::unreadable();
        }
    };

    let workspaces = match load_workspaces(path) {
        Ok(workspaces) => workspaces,
        Err(e) => {
            debug!("State-файл {:?} не разобран: {}", path, e);
            return StateFileReading::unreadable();
        }
    };

    // Время модификации из будущего (сдвиг часов) считаем нулевым возрастом
    let age_seconds = metadata.modified().ok().map(|modified| {
        now.duration_since(modified)
            .map(|age| age.as_secs_f64())
            .unwrap_or(0.0)
    });

    StateFileReading {
        exists: true,
        age_seconds,
        workspaces,
    }
}

fn load_workspaces(path: &Path) -> Result<WorkspaceState> {
    let raw = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&raw)?;
    parse_workspaces(&document)
}

/// Извлекает рабочие области из документа.
///
/// Неверный тип значения у ключа обнуляет только этот ключ; ошибкой считается
/// лишь документ, который не является объектом.
pub fn parse_workspaces(document: &Value) -> Result<WorkspaceState> {
    let object = document
        .as_object()
        .ok_or_else(|| pulse_error!(probe, "верхний уровень state-файла не является объектом"))?;

    let saved_roots = string_list(object.get(SAVED_ROOTS_KEY));
    let active_roots: HashSet<String> = string_list(object.get(ACTIVE_ROOTS_KEY))
        .into_iter()
        .collect();

    let labels_by_root: HashMap<String, String> = match object.get(ROOT_LABELS_KEY) {
        Some(Value::Object(labels)) => labels
            .iter()
            .filter_map(|(root, label)| label.as_str().map(|l| (root.clone(), l.to_string())))
            .collect(),
        _ => HashMap::new(),
    };

    Ok(WorkspaceState::new(saved_roots, active_roots, labels_by_root))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
