//! Probes: responsibility and boundaries
//!
//! Each probe acquires exactly one signal (process table, state file, UI text)
//! and returns a plain reading. Probes MUST NOT fail the tick: every OS-level
//! error degrades to the probe's default reading. Fusion and hysteresis live
//! elsewhere.

mod accessibility;
mod command;
mod dry_run;
mod process;
mod state_file;
mod r#trait;

pub use self::command::CommandRunner;
#[cfg(test)]
pub use self::dry_run::DryRunScenario;
pub use self::dry_run::DryRunScript;
pub use self::r#trait::{create_probes, ProbeSet};
#[cfg(test)]
pub use self::r#trait::{AccessibilityProbe, ProcessProbe};
