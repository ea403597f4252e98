//! Process-wide configuration.
//!
//! The reference engine keeps a handful of process-wide knobs (thread model,
//! thread count, partitioning strategy, property-check bypass, benchmark
//! data path) in global mutable state set once at library init. Per Design
//! Notes, we replace that with an immutable [`Config`] value constructed
//! once and threaded explicitly through matrix-handle creation.

use crate::types::{PartitionKind, ThreadModel};
use alloc::string::String;

/// Environment variable that, when set to `"yes"`, bypasses the `O(nnz)`
/// asserted-property check on matrix creation.
pub const BYPASS_CHECK_ENV: &str = "OSKI_BYPASS_CHECK";

#[cfg(feature = "std")]
lazy_static::lazy_static! {
    /// Process-wide, read-once cache of `OSKI_BYPASS_CHECK`. A `lazy_static`
    /// rather than a per-call `std::env::var` to mirror the reference
    /// engine's one-time env read at library init, even though the rest of
    /// this module is an explicit, immutable `Config` rather than a mutable
    /// global registry.
    static ref ENV_BYPASS_CHECK: bool = std::env::var(BYPASS_CHECK_ENV).map(|v| v == "yes").unwrap_or(false);
}

/// Process-wide engine configuration, set before any matrix is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Threading strategy used to dispatch per-partition kernel calls.
    pub thread_model: ThreadModel,
    /// Number of worker threads, `T`.
    pub thread_count: usize,
    /// Partitioning strategy.
    pub partition_kind: PartitionKind,
    /// Requested partition count; adjusted upward to a multiple of
    /// `thread_count` by the partitioner (spec.md §4.6).
    pub partition_count: usize,
    /// Skip the `O(nnz)` asserted-property validation on matrix creation.
    pub bypass_property_check: bool,
    /// Directory containing per-platform register-profile files (§6).
    pub benchmark_data_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_model: ThreadModel::Single,
            thread_count: 1,
            partition_kind: PartitionKind::OneD,
            partition_count: 1,
            bypass_property_check: false,
            benchmark_data_path: None,
        }
    }
}

impl Config {
    /// Build a configuration for `thread_count` workers using the given
    /// thread model and partitioning strategy, with one partition per
    /// thread.
    pub fn with_threads(thread_model: ThreadModel, thread_count: usize, partition_kind: PartitionKind) -> Self {
        let thread_count = thread_count.max(1);
        Self {
            thread_model,
            thread_count,
            partition_kind,
            partition_count: thread_count,
            bypass_property_check: false,
            benchmark_data_path: None,
        }
    }

    /// Build a configuration from the process environment, honoring
    /// `OSKI_BYPASS_CHECK=yes` on top of the supplied defaults.
    ///
    /// The environment is read once per process (cached in
    /// [`ENV_BYPASS_CHECK`]), the same way OSKI reads its env-derived knobs
    /// at library init rather than on every matrix construction.
    #[cfg(feature = "std")]
    pub fn from_env(defaults: Config) -> Self {
        Self {
            bypass_property_check: *ENV_BYPASS_CHECK || defaults.bypass_property_check,
            ..defaults
        }
    }

    /// Adjust `partition_count` upward so it is both `>= thread_count` and
    /// a multiple of `thread_count`, per spec.md §4.6.
    pub fn normalized_partition_count(&self) -> usize {
        let t = self.thread_count.max(1);
        let p = self.partition_count.max(t);
        let remainder = p % t;
        if remainder == 0 {
            p
        } else {
            p + (t - remainder)
        }
    }
}
