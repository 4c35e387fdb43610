//! Default constants for VM configuration.

/// Default instruction budget per `execute` call.
///
/// Large enough for any realistic test program, small enough to stop a
/// runaway loop within a second or two.
pub const DEFAULT_MAX_INSTRUCTIONS: u64 = 10_000_000;

/// Verify functions before executing them by default.
pub const DEFAULT_VERIFY: bool = true;

/// Contract violations abort with an error (not a panic) by default.
pub const DEFAULT_STRICT_CONTRACTS: bool = false;
