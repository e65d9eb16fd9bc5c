// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Exponential backoff schedule for token exchange retries.

use std::time::Duration;

/// Delay before retrying after failed attempt `attempt` (0-indexed).
///
/// The delay doubles per attempt from `base_ms` and is capped at `max_ms`:
/// `min(base_ms * 2^attempt, max_ms)`.
pub fn retry_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt_until_the_cap() {
        assert_eq!(retry_delay(0, 1_000, 10_000), Duration::from_millis(1_000));
        assert_eq!(retry_delay(1, 1_000, 10_000), Duration::from_millis(2_000));
        assert_eq!(retry_delay(2, 1_000, 10_000), Duration::from_millis(4_000));
        assert_eq!(retry_delay(3, 1_000, 10_000), Duration::from_millis(8_000));
        assert_eq!(retry_delay(4, 1_000, 10_000), Duration::from_millis(10_000));
        assert_eq!(retry_delay(10, 1_000, 10_000), Duration::from_millis(10_000));
    }

    #[test]
    fn large_attempt_counts_do_not_overflow() {
        assert_eq!(retry_delay(u32::MAX, 1_000, 10_000), Duration::from_millis(10_000));
    }
}
