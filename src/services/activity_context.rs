use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::events::{ActivitySnapshot, Scope, WorkspaceRow};
use crate::services::scope::ScopeProjector;

/// ActivityContext provides read-only access to the last committed tick.
///
/// Responsibilities (strict):
/// - Hold the latest `ActivitySnapshot` behind a pointer swap; readers never wait on probe I/O.
/// - Answer scope queries against the committed stable state.
/// - Do NOT run probes or touch hysteresis; only the poller publishes.
pub trait ActivityContext: Send + Sync {
    fn latest(&self) -> Arc<ActivitySnapshot>;
    fn publish(&self, snapshot: Arc<ActivitySnapshot>);
    fn stable_busy(&self) -> bool;
    fn last_tick(&self) -> u64;

    fn project(&self, scope: &Scope) -> bool {
        let snapshot = self.latest();
        ScopeProjector::project(scope, snapshot.stable_busy, &snapshot.workspaces.active_roots)
    }

    fn workspace_rows(&self) -> Vec<WorkspaceRow> {
        let snapshot = self.latest();
        ScopeProjector::rows(&snapshot.workspaces, snapshot.stable_busy)
    }
}

/// Default implementation of ActivityContext backed by an `Arc` swap under a short lock.
pub struct DefaultActivityContext {
    snapshot: RwLock<Arc<ActivitySnapshot>>, // лок держится только на время клонирования Arc
    stable_busy: AtomicBool,
    tick: AtomicU64,
}

impl Default for DefaultActivityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultActivityContext {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(ActivitySnapshot::initial())),
            stable_busy: AtomicBool::new(false),
            tick: AtomicU64::new(0),
        }
    }
}

impl ActivityContext for DefaultActivityContext {
    fn latest(&self) -> Arc<ActivitySnapshot> {
        self.snapshot.read().clone()
    }

    fn publish(&self, snapshot: Arc<ActivitySnapshot>) {
        let stable_busy = snapshot.stable_busy;
        let tick = snapshot.tick;
        *self.snapshot.write() = snapshot;
        self.stable_busy.store(stable_busy, Ordering::Release);
        self.tick.store(tick, Ordering::Release);
    }

    fn stable_busy(&self) -> bool {
        self.stable_busy.load(Ordering::Acquire)
    }

    fn last_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{SignalSnapshot, WorkspaceState};

    fn busy_snapshot(tick: u64, stable_busy: bool) -> Arc<ActivitySnapshot> {
        let workspaces = WorkspaceState::new(
            vec!["/work/a".into(), "/work/b".into()],
            ["/work/a".to_string()].into_iter().collect(),
            Default::default(),
        );
        Arc::new(ActivitySnapshot::new(tick, SignalSnapshot::default(), stable_busy, workspaces))
    }

    #[test]
    fn starts_dormant_at_tick_zero() {
        let ctx = DefaultActivityContext::new();
        assert!(!ctx.stable_busy());
        assert_eq!(ctx.last_tick(), 0);
        assert_eq!(ctx.latest().tick, 0);
        assert!(!ctx.project(&Scope::All));
    }

    #[test]
    fn publish_swaps_snapshot_and_flags() {
        let ctx = DefaultActivityContext::new();
        let held = ctx.latest();

        ctx.publish(busy_snapshot(5, true));
        assert!(ctx.stable_busy());
        assert_eq!(ctx.last_tick(), 5);
        // Ранее выданная ссылка не меняется
        assert_eq!(held.tick, 0);

        assert!(ctx.project(&Scope::Workspace("/work/a".into())));
        assert!(!ctx.project(&Scope::Workspace("/work/b".into())));
        let rows = ctx.workspace_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].busy);
    }

    #[test]
    fn dormant_global_state_gates_workspaces() {
        let ctx = DefaultActivityContext::new();
        ctx.publish(busy_snapshot(1, false));
        assert!(!ctx.project(&Scope::Workspace("/work/a".into())));
    }
}
