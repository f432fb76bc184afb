//! Release versions and update detection.
//!
//! - [`VersionTag`]: numeric release versions parsed from tag names, compared
//!   with zero padding
//! - [`VersionResolver`]: lists a mirror's tags (with bounded retries) and
//!   produces an [`UpdateReport`]
//! - [`detect_current_version`]: figures out which version is running

pub mod resolver;
pub mod tag;

pub use resolver::{UpdateReport, VersionResolver, detect_current_version, embedded_version};
pub use tag::{VersionTag, latest_version};
