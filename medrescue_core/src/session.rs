//! Live traversal of a protocol graph.
//!
//! A [`ProtocolSession`] borrows an immutable [`ProtocolGraph`] and owns
//! everything that changes during a run:
//! - The current node id
//! - An append-only history of visited nodes
//! - Count-down timers keyed by node id
//!
//! Invalid runtime input (unknown node ids, out-of-range choices) is
//! logged and returned as an error; the session state is left untouched.

use crate::protocol::ProtocolGraph;
use crate::timer::{remaining_at, Clock, SystemClock, TimerStatus, DEFAULT_URGENT_THRESHOLD_SECONDS};
use crate::{HistoryEntry, NodeKind, ProtocolError, ProtocolNode, TimerRuntimeState};
use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// What an operation did to the current node
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transition {
    Moved { from: String, to: String },
    Stayed,
}

impl Transition {
    pub fn moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }
}

/// Snapshot of a session for rendering
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub current_node: ProtocolNode,
    pub history: Vec<HistoryEntry>,
    pub active_timers: Vec<TimerStatus>,
}

pub struct ProtocolSession<'g, C: Clock = SystemClock> {
    id: Uuid,
    graph: &'g ProtocolGraph,
    clock: C,
    current: String,
    history: Vec<HistoryEntry>,
    timers: HashMap<String, TimerRuntimeState>,
    urgent_threshold_seconds: u32,
}

impl<'g> ProtocolSession<'g, SystemClock> {
    /// Start a session at the graph's entry node using wall-clock time
    pub fn new(graph: &'g ProtocolGraph) -> Self {
        Self::with_clock(graph, SystemClock)
    }
}

impl<'g, C: Clock> ProtocolSession<'g, C> {
    pub fn with_clock(graph: &'g ProtocolGraph, clock: C) -> Self {
        let start = graph.start_id().to_string();
        let history = vec![HistoryEntry {
            node_id: start.clone(),
            timestamp: clock.now(),
        }];
        let id = Uuid::new_v4();

        tracing::debug!("Session {} started at node {}", id, start);

        Self {
            id,
            graph,
            clock,
            current: start,
            history,
            timers: HashMap::new(),
            urgent_threshold_seconds: DEFAULT_URGENT_THRESHOLD_SECONDS,
        }
    }

    /// Override the urgency threshold used by [`Self::timer_statuses`]
    pub fn with_urgent_threshold(mut self, seconds: u32) -> Self {
        self.urgent_threshold_seconds = seconds;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn graph(&self) -> &'g ProtocolGraph {
        self.graph
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn current_node_id(&self) -> &str {
        &self.current
    }

    /// The current node; its id is always one the graph contains
    pub fn current_node(&self) -> &'g ProtocolNode {
        self.graph
            .get(&self.current)
            .unwrap_or_else(|| self.graph.start_node())
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn timer(&self, node_id: &str) -> Option<&TimerRuntimeState> {
        self.timers.get(node_id)
    }

    /// True while a tick could still change something: a running timer has
    /// time left, or the current node's timer expired and has not yet fired
    pub fn has_active_countdown(&self) -> bool {
        self.timers
            .values()
            .any(|t| t.running && t.remaining_seconds > 0)
            || self.pending_expiry().is_some()
    }

    /// Move to `target`
    ///
    /// An empty target does nothing. Whether `target` is actually a
    /// successor of the current node is not checked.
    pub fn advance(&mut self, target: &str) -> Result<Transition, ProtocolError> {
        if target.is_empty() {
            return Ok(Transition::Stayed);
        }

        if !self.graph.contains(target) {
            let err = ProtocolError::DanglingNodeReference {
                from: self.current.clone(),
                target: target.to_string(),
            };
            tracing::error!("Session {}: {}", self.id, err);
            return Err(err);
        }

        let from = std::mem::replace(&mut self.current, target.to_string());
        self.history.push(HistoryEntry {
            node_id: target.to_string(),
            timestamp: self.clock.now(),
        });

        tracing::info!("Session {}: {} -> {}", self.id, from, target);

        Ok(Transition::Moved {
            from,
            to: target.to_string(),
        })
    }

    /// Follow the current node's single successor
    ///
    /// Decision and end nodes stay put.
    pub fn advance_default(&mut self) -> Result<Transition, ProtocolError> {
        match self.current_node().next() {
            Some(next) => self.advance(next),
            None => Ok(Transition::Stayed),
        }
    }

    /// Follow option `index` of the current decision node
    pub fn choose(&mut self, index: usize) -> Result<Transition, ProtocolError> {
        let node = self.current_node();
        let target = match &node.kind {
            NodeKind::Decision { options } => options.get(index).map(|o| o.next.as_str()),
            _ => None,
        };

        match target {
            Some(next) => self.advance(next),
            None => {
                let err = ProtocolError::InvalidOption {
                    node: node.id.clone(),
                    index,
                };
                tracing::error!("Session {}: {}", self.id, err);
                Err(err)
            }
        }
    }

    /// Back to the entry node with a single fresh history entry and no timers
    pub fn reset(&mut self) {
        self.current = self.graph.start_id().to_string();
        self.history.clear();
        self.history.push(HistoryEntry {
            node_id: self.current.clone(),
            timestamp: self.clock.now(),
        });
        self.timers.clear();

        tracing::info!("Session {} reset", self.id);
    }

    /// Create or replace a running timer for `node_id`
    pub fn start_timer(&mut self, node_id: &str, duration_seconds: u32) -> Result<(), ProtocolError> {
        if !self.graph.contains(node_id) {
            let err = ProtocolError::UnknownNode(node_id.to_string());
            tracing::error!("Session {}: cannot start timer: {}", self.id, err);
            return Err(err);
        }

        self.timers.insert(
            node_id.to_string(),
            TimerRuntimeState {
                duration_seconds,
                remaining_seconds: duration_seconds,
                running: true,
                started_at: self.clock.now(),
                auto_advanced: false,
            },
        );

        tracing::info!(
            "Session {}: timer {} started for {}s",
            self.id,
            node_id,
            duration_seconds
        );
        Ok(())
    }

    /// Start the timer of the current node if it is a timer node
    ///
    /// Returns false when the current node has no timer.
    pub fn start_current_timer(&mut self) -> Result<bool, ProtocolError> {
        match self.current_node().kind {
            NodeKind::Timer {
                duration_seconds, ..
            } => {
                let id = self.current.clone();
                self.start_timer(&id, duration_seconds)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Stop a timer, freezing its remaining time as of now
    pub fn pause_timer(&mut self, node_id: &str) -> Result<(), ProtocolError> {
        let now = self.clock.now();
        let Some(timer) = self.timers.get_mut(node_id) else {
            let err = ProtocolError::UnknownNode(node_id.to_string());
            tracing::warn!("Session {}: no timer to pause: {}", self.id, err);
            return Err(err);
        };

        if timer.running {
            timer.remaining_seconds = remaining_at(timer, now);
            timer.running = false;
            tracing::info!(
                "Session {}: timer {} paused with {}s left",
                self.id,
                node_id,
                timer.remaining_seconds
            );
        }
        Ok(())
    }

    /// Continue a paused timer from its frozen remaining time
    pub fn resume_timer(&mut self, node_id: &str) -> Result<(), ProtocolError> {
        let now = self.clock.now();
        let Some(timer) = self.timers.get_mut(node_id) else {
            let err = ProtocolError::UnknownNode(node_id.to_string());
            tracing::warn!("Session {}: no timer to resume: {}", self.id, err);
            return Err(err);
        };

        if !timer.running {
            let elapsed = timer.duration_seconds - timer.remaining_seconds.min(timer.duration_seconds);
            timer.started_at = now - ChronoDuration::seconds(i64::from(elapsed));
            timer.running = true;
            tracing::info!("Session {}: timer {} resumed", self.id, node_id);
        }
        Ok(())
    }

    /// Recompute every running timer from the clock
    ///
    /// If the current node's timer has expired and has not fired yet, the
    /// session moves to that node's successor. At most one move per tick.
    /// A timer on a node without a single successor (decision or end)
    /// fires without moving the session.
    pub fn tick(&mut self) -> Option<Transition> {
        let now = self.clock.now();
        for timer in self.timers.values_mut().filter(|t| t.running) {
            timer.remaining_seconds = remaining_at(timer, now);
        }

        let node_id = self.pending_expiry()?;
        if let Some(timer) = self.timers.get_mut(&node_id) {
            timer.auto_advanced = true;
        }
        tracing::info!("Session {}: timer {} expired", self.id, node_id);

        let next = self.current_node().next()?.to_string();
        self.advance(&next).ok()
    }

    /// Id of the current node if its timer expired and has not fired yet
    fn pending_expiry(&self) -> Option<String> {
        self.timers
            .get(&self.current)
            .filter(|t| t.running && t.remaining_seconds == 0 && !t.auto_advanced)
            .map(|_| self.current.clone())
    }

    /// Presentation status of every timer, oldest first
    pub fn timer_statuses(&self) -> Vec<TimerStatus> {
        let mut timers: Vec<_> = self.timers.iter().collect();
        timers.sort_by(|(a_id, a), (b_id, b)| {
            a.started_at.cmp(&b.started_at).then_with(|| a_id.cmp(b_id))
        });

        timers
            .into_iter()
            .map(|(id, state)| {
                let title = self.graph.get(id).map(|n| n.title.as_str()).unwrap_or(id);
                TimerStatus::new(id, title, state, self.urgent_threshold_seconds)
            })
            .collect()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            current_node: self.current_node().clone(),
            history: self.history.clone(),
            active_timers: self.timer_statuses(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_default_catalog;
    use crate::timer::{ManualClock, Ticker};
    use std::time::Duration;

    fn acls() -> ProtocolGraph {
        build_default_catalog()
            .protocols
            .remove("acls-cardiac-arrest")
            .unwrap()
            .graph
    }

    #[test]
    fn test_starts_with_single_history_entry() {
        let graph = acls();
        let session = ProtocolSession::new(&graph);
        assert_eq!(session.current_node_id(), "start");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].node_id, "start");
    }

    #[test]
    fn test_walks_shockable_branch() {
        crate::logging::init_test();
        let graph = acls();
        let mut session = ProtocolSession::with_clock(&graph, ManualClock::default());

        session.advance_default().unwrap();
        session.advance_default().unwrap();
        assert_eq!(session.current_node_id(), "rhythm-check");

        let t = session.choose(0).unwrap();
        assert_eq!(
            t,
            Transition::Moved {
                from: "rhythm-check".into(),
                to: "shock".into()
            }
        );

        let visited: Vec<_> = session.history().iter().map(|h| h.node_id.as_str()).collect();
        assert_eq!(visited, vec!["start", "cpr", "rhythm-check", "shock"]);
    }

    #[test]
    fn test_permissive_jump() {
        let graph = acls();
        let mut session = ProtocolSession::new(&graph);

        // "shock" is not a successor of "start"; the jump is still taken
        let t = session.advance("shock").unwrap();
        assert!(t.moved());
        assert_eq!(session.current_node_id(), "shock");
    }

    #[test]
    fn test_unknown_target_leaves_state_unchanged() {
        let graph = acls();
        let mut session = ProtocolSession::new(&graph);
        session.advance("cpr").unwrap();

        let err = session.advance("does-not-exist").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::DanglingNodeReference {
                from: "cpr".into(),
                target: "does-not-exist".into()
            }
        );
        assert_eq!(session.current_node_id(), "cpr");
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_empty_target_is_noop() {
        let graph = acls();
        let mut session = ProtocolSession::new(&graph);
        assert_eq!(session.advance("").unwrap(), Transition::Stayed);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_choose_rejects_bad_option() {
        let graph = acls();
        let mut session = ProtocolSession::new(&graph);

        assert!(matches!(
            session.choose(0),
            Err(ProtocolError::InvalidOption { .. })
        ));

        session.advance("rhythm-check").unwrap();
        assert_eq!(
            session.choose(5).unwrap_err(),
            ProtocolError::InvalidOption {
                node: "rhythm-check".into(),
                index: 5
            }
        );
        assert_eq!(session.current_node_id(), "rhythm-check");
    }

    #[test]
    fn test_end_node_stays() {
        let graph = acls();
        let mut session = ProtocolSession::new(&graph);
        session.advance("end").unwrap();
        assert_eq!(session.advance_default().unwrap(), Transition::Stayed);
    }

    #[test]
    fn test_reset() {
        let graph = acls();
        let clock = ManualClock::default();
        let mut session = ProtocolSession::with_clock(&graph, clock.clone());
        session.advance("cpr-cycle-2").unwrap();
        session.start_current_timer().unwrap();
        clock.advance_seconds(5);

        session.reset();

        assert_eq!(session.current_node_id(), "start");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].timestamp, clock.now());
        assert!(session.timer("cpr-cycle-2").is_none());
        assert!(!session.has_active_countdown());
    }

    #[test]
    fn test_cpr_cycle_timer_auto_advances_once() {
        crate::logging::init_test();
        let graph = acls();
        let clock = ManualClock::default();
        let mut session = ProtocolSession::with_clock(&graph, clock.clone());

        session.advance("cpr-cycle-2").unwrap();
        assert!(session.start_current_timer().unwrap());

        let mut transitions = Vec::new();
        for _ in 0..120 {
            clock.advance_seconds(1);
            if let Some(t) = session.tick() {
                transitions.push(t);
            }
        }

        assert_eq!(session.timer("cpr-cycle-2").unwrap().remaining_seconds, 0);
        assert_eq!(session.current_node_id(), "rhythm-check-2");
        assert_eq!(
            transitions,
            vec![Transition::Moved {
                from: "cpr-cycle-2".into(),
                to: "rhythm-check-2".into()
            }]
        );

        // Coming back to the expired timer's node does not fire it again
        session.advance("cpr-cycle-2").unwrap();
        for _ in 0..5 {
            clock.advance_seconds(1);
            assert!(session.tick().is_none());
        }
        assert_eq!(session.current_node_id(), "cpr-cycle-2");
    }

    #[test]
    fn test_expired_timer_fires_when_node_becomes_current() {
        let graph = acls();
        let clock = ManualClock::default();
        let mut session = ProtocolSession::with_clock(&graph, clock.clone());

        session.start_timer("cpr-cycle-2", 10).unwrap();
        clock.advance_seconds(30);
        assert!(session.tick().is_none());
        assert_eq!(session.current_node_id(), "start");

        session.advance("cpr-cycle-2").unwrap();
        let t = session.tick().unwrap();
        assert_eq!(
            t,
            Transition::Moved {
                from: "cpr-cycle-2".into(),
                to: "rhythm-check-2".into()
            }
        );
    }

    #[test]
    fn test_start_timer_unknown_node() {
        let graph = acls();
        let mut session = ProtocolSession::new(&graph);
        assert_eq!(
            session.start_timer("ghost", 60).unwrap_err(),
            ProtocolError::UnknownNode("ghost".into())
        );
        assert!(session.timer("ghost").is_none());
    }

    #[test]
    fn test_pause_and_resume() {
        let graph = acls();
        let clock = ManualClock::default();
        let mut session = ProtocolSession::with_clock(&graph, clock.clone());
        session.start_timer("cpr-cycle-2", 120).unwrap();

        clock.advance_seconds(20);
        session.pause_timer("cpr-cycle-2").unwrap();
        assert_eq!(session.timer("cpr-cycle-2").unwrap().remaining_seconds, 100);

        // Paused timers are not recomputed
        clock.advance_seconds(60);
        session.tick();
        let timer = session.timer("cpr-cycle-2").unwrap();
        assert!(!timer.running);
        assert_eq!(timer.remaining_seconds, 100);

        session.resume_timer("cpr-cycle-2").unwrap();
        clock.advance_seconds(10);
        session.tick();
        assert_eq!(session.timer("cpr-cycle-2").unwrap().remaining_seconds, 90);

        assert!(session.pause_timer("cpr").is_err());
    }

    #[test]
    fn test_view_snapshot() {
        let graph = acls();
        let clock = ManualClock::default();
        let mut session = ProtocolSession::with_clock(&graph, clock.clone());
        session.advance("cpr-cycle-2").unwrap();
        session.start_current_timer().unwrap();
        clock.advance_seconds(95);
        session.tick();

        let view = session.view();
        assert_eq!(view.current_node.id, "cpr-cycle-2");
        assert_eq!(view.history.len(), 2);
        assert_eq!(view.active_timers.len(), 1);

        let status = &view.active_timers[0];
        assert_eq!(status.title, "CPR Cycle (2 minutes)");
        assert_eq!(status.remaining_seconds, 25);
        assert!(status.is_urgent);
        assert_eq!(status.display, "0:25");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["current_node"]["type"], "timer");
    }

    #[test]
    fn test_ticker_drives_until_expiry() {
        let graph = acls();
        let mut session = ProtocolSession::with_clock(&graph, ManualClock::default());
        session.advance("cpr-cycle-2").unwrap();
        session.start_current_timer().unwrap();

        let mut moves = 0;
        let ticks = Ticker::new(Duration::from_secs(1)).drive(&mut session, |_, t| {
            if t.is_some() {
                moves += 1;
            }
            true
        });

        assert_eq!(ticks, 120);
        assert_eq!(moves, 1);
        assert_eq!(session.current_node_id(), "rhythm-check-2");
        assert!(!session.has_active_countdown());
    }

    #[test]
    fn test_ticker_stops_when_callback_declines() {
        let graph = acls();
        let mut session = ProtocolSession::with_clock(&graph, ManualClock::default());
        session.start_timer("cpr-cycle-2", 120).unwrap();

        let ticks = Ticker::default().drive(&mut session, |s, _| {
            s.timer("cpr-cycle-2").unwrap().remaining_seconds > 100
        });

        assert_eq!(ticks, 20);
    }

    #[test]
    fn test_timer_on_decision_node_expires_without_moving() {
        let graph = acls();
        let mut session = ProtocolSession::with_clock(&graph, ManualClock::default());
        session.advance("rhythm-check").unwrap();
        session.start_timer("rhythm-check", 5).unwrap();

        let mut calls = 0;
        let ticks = Ticker::default().drive(&mut session, |_, t| {
            assert!(t.is_none());
            calls += 1;
            calls < 1_000
        });

        assert_eq!(ticks, 5);
        assert_eq!(session.current_node_id(), "rhythm-check");
        assert_eq!(session.history().len(), 2);
        let timer = session.timer("rhythm-check").unwrap();
        assert_eq!(timer.remaining_seconds, 0);
        assert!(timer.auto_advanced);
        assert!(!session.has_active_countdown());
    }

    #[test]
    fn test_timer_on_end_node_fires_once() {
        let graph = acls();
        let clock = ManualClock::default();
        let mut session = ProtocolSession::with_clock(&graph, clock.clone());
        session.advance("end").unwrap();
        session.start_timer("end", 3).unwrap();

        clock.advance_seconds(3);
        assert_eq!(session.tick(), None);
        assert_eq!(session.current_node_id(), "end");
        assert!(!session.has_active_countdown());

        clock.advance_seconds(3);
        assert_eq!(session.tick(), None);
        assert_eq!(session.history().len(), 2);
    }
}
