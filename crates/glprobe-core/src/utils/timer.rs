// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CPU-side time measurement.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A monotonic stopwatch, started on creation.
///
/// Trackers keep one as their time origin so every timestamp they record is
/// "milliseconds since this component started", like `performance.now()`.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Creates a stopwatch started now.
    #[inline]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Restarts the stopwatch from now.
    #[inline]
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
    }

    /// Time elapsed since the stopwatch was started.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Time elapsed since the stopwatch was started, in fractional milliseconds.
    #[inline]
    pub fn elapsed_ms_f64(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Time elapsed since the stopwatch was started, in seconds.
    #[inline]
    pub fn elapsed_secs_f64(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock milliseconds since the Unix epoch, or 0 if the clock is set
/// before it.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SLEEP_DURATION_MS: u64 = 20;

    #[test]
    fn stopwatch_elapsed_time_near_zero_initially() {
        let watch = Stopwatch::new();
        assert!(
            watch.elapsed() < Duration::from_millis(SLEEP_DURATION_MS),
            "Initial elapsed duration should be very small"
        );
    }

    #[test]
    fn stopwatch_elapsed_time_after_delay() {
        let watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(SLEEP_DURATION_MS));

        let elapsed_ms = watch.elapsed_ms_f64();
        assert!(
            elapsed_ms >= SLEEP_DURATION_MS as f64,
            "Elapsed ms ({elapsed_ms}) should be >= sleep duration ms ({SLEEP_DURATION_MS})"
        );
        assert!((watch.elapsed_secs_f64() * 1000.0) >= elapsed_ms);
    }

    #[test]
    fn stopwatch_restart_resets_origin() {
        let mut watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(SLEEP_DURATION_MS));
        watch.restart();
        assert!(watch.elapsed() < Duration::from_millis(SLEEP_DURATION_MS));
    }

    #[test]
    fn epoch_millis_is_after_2020() {
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
