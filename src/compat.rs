//! # Platform Compatibility
//!
//! Fault-tolerant inference stacks reference a hard-kill termination
//! signal when tearing down unresponsive worker processes. POSIX names
//! it `SIGKILL`; Windows has no equivalent signal and historically
//! forced callers to patch a dummy attribute in before loading ML
//! frameworks that mention it. Here the constant is simply defined on
//! every platform, so no conditional injection is ever needed.

/// Signal used to forcibly terminate a worker process.
///
/// On Unix this is the platform's `SIGKILL`. Windows does not deliver
/// POSIX signals; the console CTRL_BREAK event id stands in as the
/// placeholder value (the attribute only has to exist and be a valid
/// positive id; it is never used to alter signal delivery).
#[cfg(unix)]
pub const RANK_TERMINATION_SIGNAL: i32 = libc::SIGKILL;

/// Windows CTRL_BREAK_EVENT console event id.
#[cfg(windows)]
pub const RANK_TERMINATION_SIGNAL: i32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    /// The constant must be defined with a valid id on every platform.
    #[test]
    fn test_termination_signal_defined() {
        assert!(RANK_TERMINATION_SIGNAL > 0);
    }

    /// On Unix the value must be the real SIGKILL, unchanged.
    #[cfg(unix)]
    #[test]
    fn test_termination_signal_is_sigkill_on_unix() {
        assert_eq!(RANK_TERMINATION_SIGNAL, libc::SIGKILL);
    }
}
