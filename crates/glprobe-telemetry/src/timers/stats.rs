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

//! Rolling statistics of resolved GPU samples.

use glprobe_core::TimerStats;
use std::collections::VecDeque;

/// All-time aggregates plus a bounded window of recent samples.
#[derive(Debug, Clone)]
pub struct RollingStats {
    window: VecDeque<f64>,
    capacity: usize,
    last: f64,
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
}

impl RollingStats {
    /// Creates empty statistics keeping up to `capacity` recent samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            last: 0.0,
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: 0.0,
        }
    }

    /// Folds in one sample, evicting the oldest windowed sample when full.
    pub fn push(&mut self, ms: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(ms);
        self.last = ms;
        self.sum += ms;
        self.count += 1;
        self.min = self.min.min(ms);
        self.max = self.max.max(ms);
    }

    /// 95th percentile of the window: the sorted window indexed at
    /// `floor(len * 0.95)`, clamped to the last element.
    pub fn p95(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.window.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let index = ((sorted.len() as f64 * 0.95).floor() as usize).min(sorted.len() - 1);
        sorted[index]
    }

    /// Number of samples folded in.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The aggregate view.
    pub fn snapshot(&self) -> TimerStats {
        TimerStats {
            last: self.last,
            average: if self.count == 0 {
                0.0
            } else {
                self.sum / self.count as f64
            },
            p95: self.p95(),
            min: if self.count == 0 { 0.0 } else { self.min },
            max: self.max,
            samples: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_covers_every_sample() {
        let mut stats = RollingStats::new(2);
        for ms in [1.0, 2.0, 3.0, 4.0] {
            stats.push(ms);
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.average, 2.5);
        assert_eq!(snapshot.samples, 4);
        assert_eq!(snapshot.last, 4.0);
    }

    #[test]
    fn test_max_and_min_are_all_time() {
        let mut stats = RollingStats::new(2);
        for ms in [9.0, 0.5, 3.0, 4.0] {
            stats.push(ms);
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.max, 9.0);
        assert_eq!(snapshot.min, 0.5);
    }

    #[test]
    fn test_p95_indexing() {
        let mut stats = RollingStats::new(120);
        for ms in 1..=100 {
            stats.push(ms as f64);
        }
        // floor(100 * 0.95) = 95 -> the 96th smallest sample.
        assert_eq!(stats.p95(), 96.0);

        let mut single = RollingStats::new(120);
        single.push(7.0);
        assert_eq!(single.p95(), 7.0);
    }

    #[test]
    fn test_p95_uses_window_only() {
        let mut stats = RollingStats::new(3);
        stats.push(100.0);
        for _ in 0..3 {
            stats.push(1.0);
        }
        assert_eq!(stats.p95(), 1.0);
        assert_eq!(stats.snapshot().max, 100.0);
    }

    #[test]
    fn test_empty_snapshot_is_zeroed() {
        let snapshot = RollingStats::new(10).snapshot();
        assert_eq!(snapshot, TimerStats::default());
    }
}
