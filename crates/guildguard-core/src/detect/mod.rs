//! Detectors feeding the mitigation engine.
//!
//! Two independent detectors share the mitigation path: the activity
//! tracker (burst detection over create/delete actions) and the permission
//! escalation watchdog (reactive revocation of dangerous grants).

pub mod activity;
pub mod watchdog;

pub use activity::{ActivityReport, ActivityTracker};
pub use watchdog::{DangerSink, EscalationWatchdog};
