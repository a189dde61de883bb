pub mod activity;
pub mod diagnostics;
pub mod signals;
pub mod workspace;

pub use activity::ActivitySnapshot;
pub use diagnostics::DiagnosticsReport;
pub use signals::{AccessibilityReading, Confidence, ProcessReading, SignalSnapshot, StateFileReading};
pub use workspace::{Scope, WorkspaceRow, WorkspaceState};
