use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Рабочие области, как их видит целевое приложение.
///
/// Пересобирается целиком на каждом тике из state-файла; исчезнувшие записи
/// просто пропадают.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceState {
    /// Порядок из файла сохраняется для стабильного меню
    pub saved_roots: Vec<String>,
    pub active_roots: HashSet<String>,
    pub labels_by_root: HashMap<String, String>,
}

impl WorkspaceState {
    pub fn new(
        saved_roots: Vec<String>,
        active_roots: HashSet<String>,
        labels_by_root: HashMap<String, String>,
    ) -> Self {
        Self {
            saved_roots,
            active_roots,
            labels_by_root,
        }
    }

    /// Метка из файла, иначе последний сегмент пути, иначе сам путь
    pub fn label_for(&self, root: &str) -> String {
        if let Some(label) = self.labels_by_root.get(root) {
            if !label.trim().is_empty() {
                return label.clone();
            }
        }

        root.trim_end_matches('/')
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| root.to_string())
    }

    /// Сохранённые области в исходном порядке, затем активные, но не сохранённые (по алфавиту)
    pub fn ordered_roots(&self) -> Vec<&str> {
        let mut roots: Vec<&str> = self.saved_roots.iter().map(String::as_str).collect();

        let mut extra: Vec<&str> = self
            .active_roots
            .iter()
            .map(String::as_str)
            .filter(|root| !self.saved_roots.iter().any(|saved| saved == root))
            .collect();
        extra.sort_unstable();

        roots.extend(extra);
        roots
    }
}

/// Строка для отображения одной рабочей области
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceRow {
    pub root: String,
    pub label: String,
    pub busy: bool,
}

/// Выбранная пользователем область отображения
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Scope {
    #[default]
    All,
    Workspace(String),
}

impl Scope {
    pub const ALL_KEYWORD: &'static str = "all";
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::ALL_KEYWORD) {
            Scope::All
        } else {
            Scope::Workspace(trimmed.to_string())
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

impl FromStr for Scope {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Scope::from(s.to_string()))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str(Self::ALL_KEYWORD),
            Scope::Workspace(root) => f.write_str(root),
        }
    }
}
