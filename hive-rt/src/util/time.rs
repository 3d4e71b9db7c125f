//! Thread CPU clock used by dispatch profiling.

/// CPU time consumed by the calling thread, in microseconds.
///
/// Falls back to zero when the clock cannot be read; profiling figures are
/// advisory and must never abort dispatch.
#[cfg(unix)]
pub(crate) fn thread_cpu_micros() -> u64 {
    use nix::time::{clock_gettime, ClockId};

    match clock_gettime(ClockId::CLOCK_THREAD_CPUTIME_ID) {
        Ok(ts) => (ts.tv_sec() as u64)
            .saturating_mul(1_000_000)
            .saturating_add(ts.tv_nsec() as u64 / 1_000),
        Err(_) => 0,
    }
}

/// Wall-clock stand-in for platforms without a per-thread CPU clock.
#[cfg(not(unix))]
pub(crate) fn thread_cpu_micros() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}
