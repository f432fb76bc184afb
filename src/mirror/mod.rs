//! Mirror registry, reachability probes and selection.
//!
//! The application source is published on several hosts. Before every remote
//! operation the updater picks one with [`MirrorSelector::select`]:
//!
//! - **Fast path**: the mirror chosen last time is re-probed with a short
//!   timeout and reused when it answers.
//! - **Race**: every mirror is probed concurrently; among those that answered
//!   before the deadline, the first one in registry order wins.
//! - **Serial fallback**: mirrors are probed one at a time in fallback order.
//! - **Default**: the first registered mirror, so selection never fails.
//!
//! A probe lists remote tags without fetching any content.

pub mod probe;
pub mod registry;
pub mod selector;

pub use probe::{ProbeResult, probe, probe_all};
pub use registry::{GITEE_MIRROR_URL, GITHUB_MIRROR_URL, Mirror, MirrorRegistry};
pub use selector::{MirrorSelector, SelectedMirror};
