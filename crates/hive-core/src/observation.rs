//! Observation bus: real-time feedback from the outside world, queued per role.
//!
//! Volatile and in-process. Each role has its own FIFO; polling drains it.

use crate::shared::{new_id, Clock, Role};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationEvent {
    pub event_id: String,
    pub t_ms: i64,
    pub topic: String,
    pub payload: Map<String, Value>,
    pub role_targets: Vec<Role>,
}

pub struct ObservationBus {
    clock: Arc<dyn Clock>,
    queues: Mutex<HashMap<Role, VecDeque<ObservationEvent>>>,
}

impl ObservationBus {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Queues an event for each target role (`[general]` when none given). Returns its id.
    pub fn publish(
        &self,
        topic: &str,
        payload: Map<String, Value>,
        role_targets: &[Role],
    ) -> String {
        let mut targets: Vec<Role> = Vec::new();
        for r in role_targets {
            if !targets.contains(r) {
                targets.push(*r);
            }
        }
        if targets.is_empty() {
            targets.push(Role::General);
        }
        let evt = ObservationEvent {
            event_id: new_id("obs"),
            t_ms: self.clock.now_ms(),
            topic: topic.to_string(),
            payload,
            role_targets: targets,
        };
        let mut queues = self.queues.lock();
        for r in &evt.role_targets {
            queues.entry(*r).or_default().push_back(evt.clone());
        }
        evt.event_id
    }

    /// Removes and returns up to `max_events` events for `role`, oldest first.
    pub fn poll(&self, role: Role, max_events: usize) -> Vec<ObservationEvent> {
        let mut queues = self.queues.lock();
        match queues.get_mut(&role) {
            Some(q) => {
                let n = max_events.min(q.len());
                q.drain(..n).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn pending(&self, role: Role) -> usize {
        self.queues.lock().get(&role).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ManualClock;

    #[test]
    fn fans_out_to_targets_and_drains_fifo() {
        let bus = ObservationBus::new(Arc::new(ManualClock::new(0)));
        let first = bus.publish("deploy", Map::new(), &[Role::Ops, Role::Tester, Role::Ops]);
        let second = bus.publish("incident", Map::new(), &[Role::Ops]);

        assert_eq!(bus.pending(Role::Ops), 2);
        assert_eq!(bus.pending(Role::Tester), 1);
        let ops = bus.poll(Role::Ops, 1);
        assert_eq!(ops[0].event_id, first);
        assert_eq!(ops[0].role_targets, vec![Role::Ops, Role::Tester]);
        let ops = bus.poll(Role::Ops, 25);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].event_id, second);
        assert!(bus.poll(Role::Ops, 25).is_empty());
        assert!(bus.poll(Role::Sales, 25).is_empty());
    }

    #[test]
    fn defaults_to_general() {
        let bus = ObservationBus::new(Arc::new(ManualClock::new(0)));
        bus.publish("sensor", Map::new(), &[]);
        assert_eq!(bus.poll(Role::General, 10).len(), 1);
    }
}
