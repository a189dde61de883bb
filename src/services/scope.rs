use crate::events::{Scope, WorkspaceRow, WorkspaceState};
use std::collections::HashSet;

/// Проекция стабильного глобального состояния на выбранную область.
///
/// Глобальный флаг всегда доминирует: область не бывает занятой, пока
/// стабильное состояние спящее, даже если она числится активной.
pub struct ScopeProjector;

impl ScopeProjector {
    pub fn project(scope: &Scope, stable_busy: bool, active_roots: &HashSet<String>) -> bool {
        match scope {
            Scope::All => stable_busy,
            Scope::Workspace(root) => stable_busy && active_roots.contains(root),
        }
    }

    /// Строки для меню: сохранённые области, затем активные несохранённые
    pub fn rows(workspaces: &WorkspaceState, stable_busy: bool) -> Vec<WorkspaceRow> {
        workspaces
            .ordered_roots()
            .into_iter()
            .map(|root| WorkspaceRow {
                root: root.to_string(),
                label: workspaces.label_for(root),
                busy: Self::project(
                    &Scope::Workspace(root.to_string()),
                    stable_busy,
                    &workspaces.active_roots,
                ),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(roots: &[&str]) -> HashSet<String> {
        roots.iter().map(|r| r.to_string()).collect()
    }

    fn workspaces(active: &[&str]) -> WorkspaceState {
        WorkspaceState::new(
            vec!["/a".into(), "/b".into()],
            active.iter().map(|r| r.to_string()).collect(),
            Default::default(),
        )
    }

    #[test]
    fn all_scope_mirrors_stable_state() {
        let roots = active(&[]);
        assert!(ScopeProjector::project(&Scope::All, true, &roots));
        assert!(!ScopeProjector::project(&Scope::All, false, &roots));
    }

    #[test]
    fn global_gate_dominates_active_workspace() {
        let roots = active(&["/a"]);
        assert!(!ScopeProjector::project(&Scope::Workspace("/a".into()), false, &roots));
        assert!(ScopeProjector::project(&Scope::Workspace("/a".into()), true, &roots));
        assert!(!ScopeProjector::project(&Scope::Workspace("/b".into()), true, &roots));
        assert!(!ScopeProjector::project(&Scope::Workspace("/unknown".into()), true, &roots));
    }

    #[test]
    fn rows_follow_saved_order_with_projection() {
        let ws = workspaces(&["/b", "/z"]);
        let rows = ScopeProjector::rows(&ws, true);
        let summary: Vec<(&str, &str, bool)> = rows
            .iter()
            .map(|r| (r.root.as_str(), r.label.as_str(), r.busy))
            .collect();
        assert_eq!(
            summary,
            vec![("/a", "a", false), ("/b", "b", true), ("/z", "z", true)]
        );

        assert!(ScopeProjector::rows(&ws, false).iter().all(|r| !r.busy));
    }
}
