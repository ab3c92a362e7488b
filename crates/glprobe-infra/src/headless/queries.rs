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

//! Scripted timer-query behaviour for the headless driver.
//!
//! Results are assigned when a query ends: the next scripted duration if one
//! was pushed, the default duration otherwise. A result only becomes
//! available after `latency` unsuccessful availability checks, which models
//! the frames of lag a real GPU introduces.

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq)]
enum QueryState {
    Created,
    Running,
    Ended { result_ns: u64, checks_left: u32 },
}

#[derive(Debug)]
pub(crate) struct QuerySimulator {
    queries: HashMap<u32, QueryState>,
    active: Vec<u32>,
    scripted_ns: VecDeque<u64>,
    pub(crate) default_ns: u64,
    pub(crate) latency: u32,
    disjoint: bool,
    deleted: u64,
}

impl QuerySimulator {
    pub(crate) fn new(default_ns: u64, latency: u32) -> Self {
        Self {
            queries: HashMap::new(),
            active: Vec::new(),
            scripted_ns: VecDeque::new(),
            default_ns,
            latency,
            disjoint: false,
            deleted: 0,
        }
    }

    pub(crate) fn create(&mut self, name: u32) {
        self.queries.insert(name, QueryState::Created);
    }

    pub(crate) fn delete(&mut self, name: u32) {
        if self.queries.remove(&name).is_some() {
            self.deleted += 1;
        }
        self.active.retain(|&q| q != name);
    }

    pub(crate) fn begin(&mut self, name: u32) {
        match self.queries.get_mut(&name) {
            Some(state) => {
                *state = QueryState::Running;
                self.active.push(name);
            }
            None => log::warn!("beginQuery on unknown query {name}"),
        }
    }

    pub(crate) fn end(&mut self) {
        let Some(name) = self.active.pop() else {
            log::warn!("endQuery without an active query");
            return;
        };
        let result_ns = self.scripted_ns.pop_front().unwrap_or(self.default_ns);
        if let Some(state) = self.queries.get_mut(&name) {
            *state = QueryState::Ended {
                result_ns,
                checks_left: self.latency,
            };
        }
    }

    pub(crate) fn available(&mut self, name: u32) -> bool {
        match self.queries.get_mut(&name) {
            Some(QueryState::Ended { checks_left, .. }) => {
                if *checks_left == 0 {
                    true
                } else {
                    *checks_left -= 1;
                    false
                }
            }
            _ => false,
        }
    }

    pub(crate) fn result(&self, name: u32) -> u64 {
        match self.queries.get(&name) {
            Some(QueryState::Ended { result_ns, .. }) => *result_ns,
            _ => 0,
        }
    }

    pub(crate) fn push_result(&mut self, ns: u64) {
        self.scripted_ns.push_back(ns);
    }

    pub(crate) fn raise_disjoint(&mut self) {
        self.disjoint = true;
    }

    /// Reads and clears the disjoint flag, as the host API does.
    pub(crate) fn take_disjoint(&mut self) -> bool {
        std::mem::take(&mut self.disjoint)
    }

    pub(crate) fn live(&self) -> usize {
        self.queries.len()
    }

    pub(crate) fn deleted(&self) -> u64 {
        self.deleted
    }

    pub(crate) fn is_running(&self, name: u32) -> bool {
        matches!(self.queries.get(&name), Some(QueryState::Running))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_waits_for_latency() {
        let mut sim = QuerySimulator::new(1_000_000, 2);
        sim.create(1);
        sim.begin(1);
        sim.end();

        assert!(!sim.available(1));
        assert!(!sim.available(1));
        assert!(sim.available(1));
        assert_eq!(sim.result(1), 1_000_000);
    }

    #[test]
    fn test_scripted_results_are_consumed_in_order() {
        let mut sim = QuerySimulator::new(0, 0);
        sim.push_result(5);
        sim.push_result(7);
        for name in [1, 2, 3] {
            sim.create(name);
            sim.begin(name);
            sim.end();
        }
        assert_eq!(sim.result(1), 5);
        assert_eq!(sim.result(2), 7);
        assert_eq!(sim.result(3), 0);
    }

    #[test]
    fn test_nested_queries_end_innermost_first() {
        let mut sim = QuerySimulator::new(1, 0);
        sim.create(1);
        sim.create(2);
        sim.begin(1);
        sim.begin(2);
        sim.end();
        assert!(sim.is_running(1));
        assert!(sim.available(2));
    }

    #[test]
    fn test_disjoint_flag_clears_on_read() {
        let mut sim = QuerySimulator::new(1, 0);
        sim.raise_disjoint();
        assert!(sim.take_disjoint());
        assert!(!sim.take_disjoint());
    }

    #[test]
    fn test_delete_counts_once() {
        let mut sim = QuerySimulator::new(1, 0);
        sim.create(4);
        sim.delete(4);
        sim.delete(4);
        assert_eq!(sim.deleted(), 1);
        assert_eq!(sim.live(), 0);
    }
}
