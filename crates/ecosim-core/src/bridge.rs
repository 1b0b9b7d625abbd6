//! External action bridge.
//!
//! Lets a process outside the engine (typically a learning loop) drive every
//! agent through the [`ActionPolicy`] contract. The engine side is an
//! [`ExternalActionBridge`]; the host side is a [`BridgeEndpoint`]. The two
//! are connected by a pair of `std::sync::mpsc` channels, so the engine
//! never needs to know what sits on the other end.
//!
//! Each tick the bridge:
//!
//! 1. sends a [`BridgeMessage::DecisionRequest`] carrying every tracked
//!    agent's observation;
//! 2. waits up to its timeout for an [`ActionReply`] stamped with the same
//!    episode and tick;
//! 3. hands out the replied actions (clamped into `0..=4`), falling back to
//!    `Stay` for agents the reply does not cover;
//! 4. after culling, sends a [`BridgeMessage::Outcomes`] with each agent's
//!    step reward and `done` flag.
//!
//! A missing or late reply, or a dropped endpoint, is degraded operation,
//! never an error: the tick completes with every agent staying put.
//!
//! The engine-to-host queue holds at most [`OUTBOX_CAPACITY`] messages. A
//! host that stops draining its endpoint loses the newest messages rather
//! than growing the queue without bound.

use std::collections::BTreeMap;
use std::sync::mpsc::{
    self, Receiver, RecvError, RecvTimeoutError, SendError, Sender, SyncSender, TryRecvError,
    TrySendError,
};
use std::time::{Duration, Instant};

use ecosim_types::{Action, AgentId, Observation, PolicyKind, StepOutcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PolicyConfig;
use crate::decision::{ActionPolicy, SimRng};

/// Engine-to-host messages that may wait undrained on the endpoint.
pub const OUTBOX_CAPACITY: usize = 64;

/// Errors on the host side of the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The engine side of the bridge has been dropped.
    #[error("external action bridge disconnected")]
    Disconnected,
}

impl From<RecvError> for BridgeError {
    fn from(_: RecvError) -> Self {
        Self::Disconnected
    }
}

impl<T> From<SendError<T>> for BridgeError {
    fn from(_: SendError<T>) -> Self {
        Self::Disconnected
    }
}

/// Engine-to-host message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    /// Observations awaiting actions for `tick` of `episode`.
    DecisionRequest {
        /// Episode the decisions are for.
        episode: u64,
        /// Tick within the episode.
        tick: u64,
        /// Observation per tracked agent, in population order.
        observations: Vec<(AgentId, Observation)>,
    },
    /// Step rewards after `tick` of `episode` was culled.
    Outcomes {
        /// Episode the outcomes belong to.
        episode: u64,
        /// Tick within the episode.
        tick: u64,
        /// One entry per agent tracked during the tick.
        outcomes: Vec<StepOutcome>,
    },
}

/// Host-to-engine reply with one action index per agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionReply {
    /// Episode the actions are for.
    pub episode: u64,
    /// Tick within the episode. Replies for any other `(episode, tick)` are
    /// discarded.
    pub tick: u64,
    /// Raw action index per agent. Values outside `0..=4` are clamped.
    pub actions: BTreeMap<AgentId, i64>,
}

/// Engine side of the bridge; an [`ActionPolicy`].
#[derive(Debug)]
pub struct ExternalActionBridge {
    to_host: SyncSender<BridgeMessage>,
    from_host: Receiver<ActionReply>,
    timeout: Duration,
    pending: BTreeMap<AgentId, Action>,
    connected: bool,
    dropped: u64,
}

/// Host side of the bridge.
#[derive(Debug)]
pub struct BridgeEndpoint {
    from_engine: Receiver<BridgeMessage>,
    to_engine: Sender<ActionReply>,
}

impl ExternalActionBridge {
    /// Create a connected bridge/endpoint pair.
    ///
    /// `timeout` bounds how long each tick waits for the host's reply.
    pub fn channel(timeout: Duration) -> (Self, BridgeEndpoint) {
        let (to_host, from_engine) = mpsc::sync_channel(OUTBOX_CAPACITY);
        let (to_engine, from_host) = mpsc::channel();
        let bridge = Self {
            to_host,
            from_host,
            timeout,
            pending: BTreeMap::new(),
            connected: true,
            dropped: 0,
        };
        (bridge, BridgeEndpoint { from_engine, to_engine })
    }

    /// Create a pair whose reply timeout is `policy.external_timeout_ms`.
    pub fn from_config(policy: &PolicyConfig) -> (Self, BridgeEndpoint) {
        Self::channel(policy.external_timeout())
    }

    /// Whether the host endpoint is still attached.
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Reply timeout applied to every tick.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Messages discarded because the endpoint's queue was full.
    pub const fn dropped_messages(&self) -> u64 {
        self.dropped
    }

    fn send(&mut self, message: BridgeMessage) {
        if !self.connected {
            return;
        }
        match self.to_host.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped = self.dropped.saturating_add(1);
                warn!(
                    dropped = self.dropped,
                    capacity = OUTBOX_CAPACITY,
                    "External action bridge endpoint is not draining; message dropped"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("External action bridge endpoint dropped; agents will stay put");
                self.connected = false;
            }
        }
    }

    fn await_reply(&mut self, episode: u64, tick: u64) -> Option<ActionReply> {
        let started = Instant::now();
        loop {
            let remaining = self.timeout.saturating_sub(started.elapsed());
            match self.from_host.recv_timeout(remaining) {
                Ok(reply) if reply.episode == episode && reply.tick == tick => return Some(reply),
                Ok(reply) => {
                    debug!(
                        episode,
                        tick,
                        reply_episode = reply.episode,
                        reply_tick = reply.tick,
                        "Discarding stale action reply"
                    );
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        tick,
                        timeout_ms = self.timeout.as_millis(),
                        "External actions timed out; defaulting to Stay"
                    );
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(tick, "External action bridge endpoint dropped; agents will stay put");
                    self.connected = false;
                    return None;
                }
            }
        }
    }
}

impl ActionPolicy for ExternalActionBridge {
    fn kind(&self) -> PolicyKind {
        PolicyKind::External
    }

    fn request_decisions(
        &mut self,
        episode: u64,
        tick: u64,
        observations: &[(AgentId, Observation)],
    ) {
        self.pending.clear();
        if observations.is_empty() {
            return;
        }
        self.send(BridgeMessage::DecisionRequest {
            episode,
            tick,
            observations: observations.to_vec(),
        });
        if !self.connected {
            return;
        }
        if let Some(reply) = self.await_reply(episode, tick) {
            self.pending = reply
                .actions
                .into_iter()
                .map(|(id, raw)| (id, Action::clamped(raw)))
                .collect();
        }
    }

    fn decide_action(
        &mut self,
        agent_id: AgentId,
        _observation: &Observation,
        _rng: &mut SimRng,
    ) -> Action {
        self.pending.get(&agent_id).copied().unwrap_or_default()
    }

    fn record_outcomes(&mut self, episode: u64, tick: u64, outcomes: &[StepOutcome]) {
        if outcomes.is_empty() {
            return;
        }
        self.send(BridgeMessage::Outcomes {
            episode,
            tick,
            outcomes: outcomes.to_vec(),
        });
    }
}

impl BridgeEndpoint {
    /// Block until the engine sends the next message.
    ///
    /// Hosts must keep receiving, including `Outcomes` they do not use;
    /// once [`OUTBOX_CAPACITY`] messages are waiting, new ones are dropped.
    pub fn recv(&self) -> Result<BridgeMessage, BridgeError> {
        Ok(self.from_engine.recv()?)
    }

    /// Wait up to `timeout` for the next message. `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<BridgeMessage>, BridgeError> {
        match self.from_engine.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::Disconnected),
        }
    }

    /// Take the next message if one is already queued.
    pub fn try_recv(&self) -> Result<Option<BridgeMessage>, BridgeError> {
        match self.from_engine.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(BridgeError::Disconnected),
        }
    }

    /// Send the actions for one tick.
    pub fn send_actions(&self, reply: ActionReply) -> Result<(), BridgeError> {
        Ok(self.to_engine.send(reply)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    const SHORT: Duration = Duration::from_millis(20);

    fn observations(ids: &[u64]) -> Vec<(AgentId, Observation)> {
        ids.iter()
            .map(|id| (AgentId::new(*id), Observation::default()))
            .collect()
    }

    fn reply(episode: u64, tick: u64, actions: &[(u64, i64)]) -> ActionReply {
        ActionReply {
            episode,
            tick,
            actions: actions
                .iter()
                .map(|(id, raw)| (AgentId::new(*id), *raw))
                .collect(),
        }
    }

    #[test]
    fn replied_actions_are_clamped_and_missing_agents_stay() {
        let (mut bridge, endpoint) = ExternalActionBridge::channel(SHORT);
        let mut rng = SimRng::seed_from_u64(0);
        endpoint.send_actions(reply(0, 0, &[(1, 2), (2, 99)])).unwrap();

        let obs = observations(&[1, 2, 3]);
        bridge.request_decisions(0, 0, &obs);
        let o = Observation::default();
        assert_eq!(bridge.decide_action(AgentId::new(1), &o, &mut rng), Action::Right);
        assert_eq!(bridge.decide_action(AgentId::new(2), &o, &mut rng), Action::Left);
        assert_eq!(bridge.decide_action(AgentId::new(3), &o, &mut rng), Action::Stay);

        let msg = endpoint.try_recv().unwrap();
        assert!(matches!(
            msg,
            Some(BridgeMessage::DecisionRequest { episode: 0, tick: 0, ref observations })
                if observations.len() == 3
        ));
    }

    #[test]
    fn stale_reply_is_ignored() {
        let (mut bridge, endpoint) = ExternalActionBridge::channel(SHORT);
        let mut rng = SimRng::seed_from_u64(0);
        endpoint.send_actions(reply(0, 5, &[(1, 1)])).unwrap();
        bridge.request_decisions(0, 6, &observations(&[1]));
        let action = bridge.decide_action(AgentId::new(1), &Observation::default(), &mut rng);
        assert_eq!(action, Action::Stay);
        assert!(bridge.is_connected());
    }

    #[test]
    fn reply_from_previous_episode_is_ignored() {
        let (mut bridge, endpoint) = ExternalActionBridge::channel(SHORT);
        let mut rng = SimRng::seed_from_u64(0);
        // Same per-episode tick, previous episode, then the matching reply.
        endpoint.send_actions(reply(0, 3, &[(1, 1)])).unwrap();
        endpoint.send_actions(reply(1, 3, &[(1, 4)])).unwrap();
        bridge.request_decisions(1, 3, &observations(&[1]));
        let action = bridge.decide_action(AgentId::new(1), &Observation::default(), &mut rng);
        assert_eq!(action, Action::Left);
    }

    #[test]
    fn timeout_comes_from_policy_config() {
        let policy = PolicyConfig {
            external_timeout_ms: 35,
            ..PolicyConfig::default()
        };
        let (mut bridge, _endpoint) = ExternalActionBridge::from_config(&policy);
        assert_eq!(bridge.timeout(), Duration::from_millis(35));

        let started = Instant::now();
        bridge.request_decisions(0, 0, &observations(&[1]));
        assert!(started.elapsed() >= Duration::from_millis(35));
        assert!(bridge.is_connected());
    }

    #[test]
    fn dropped_endpoint_degrades_to_stay() {
        let (mut bridge, endpoint) = ExternalActionBridge::channel(SHORT);
        drop(endpoint);
        let mut rng = SimRng::seed_from_u64(0);
        bridge.request_decisions(0, 0, &observations(&[1]));
        assert!(!bridge.is_connected());
        let action = bridge.decide_action(AgentId::new(1), &Observation::default(), &mut rng);
        assert_eq!(action, Action::Stay);
        bridge.record_outcomes(0, 0, &[]);
    }

    #[test]
    fn outcomes_are_forwarded() {
        let (mut bridge, endpoint) = ExternalActionBridge::channel(SHORT);
        let outcome = StepOutcome {
            agent_id: AgentId::new(4),
            reward: -1.2,
            cumulative_reward: -3.0,
            done: true,
        };
        bridge.record_outcomes(2, 7, &[outcome]);
        let msg = endpoint.recv_timeout(SHORT).unwrap().unwrap();
        assert_eq!(
            msg,
            BridgeMessage::Outcomes {
                episode: 2,
                tick: 7,
                outcomes: vec![outcome],
            }
        );
    }

    #[test]
    fn undrained_endpoint_caps_the_queue() {
        let (mut bridge, endpoint) = ExternalActionBridge::channel(SHORT);
        let outcome = StepOutcome {
            agent_id: AgentId::new(1),
            reward: 0.2,
            cumulative_reward: 0.2,
            done: false,
        };
        let extra = 10_u64;
        let capacity = u64::try_from(OUTBOX_CAPACITY).unwrap();
        let sent = capacity.saturating_add(extra);
        for tick in 0..sent {
            bridge.record_outcomes(0, tick, &[outcome]);
        }
        assert!(bridge.is_connected());
        assert_eq!(bridge.dropped_messages(), extra);

        let mut queued = 0_usize;
        let mut last_tick = None;
        while let Some(BridgeMessage::Outcomes { tick, .. }) = endpoint.try_recv().unwrap() {
            queued = queued.saturating_add(1);
            last_tick = Some(tick);
        }
        assert_eq!(queued, OUTBOX_CAPACITY);
        assert_eq!(last_tick, Some(capacity.saturating_sub(1)));

        // Once drained, messages flow again.
        bridge.record_outcomes(0, sent, &[outcome]);
        assert!(endpoint.try_recv().unwrap().is_some());
    }

    #[test]
    fn engine_drop_disconnects_endpoint() {
        let (bridge, endpoint) = ExternalActionBridge::channel(SHORT);
        drop(bridge);
        assert!(matches!(endpoint.recv(), Err(BridgeError::Disconnected)));
        assert!(endpoint.send_actions(ActionReply::default()).is_err());
    }

    #[test]
    fn messages_serialize_with_type_tag() {
        let msg = BridgeMessage::DecisionRequest {
            episode: 1,
            tick: 3,
            observations: observations(&[1]),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"decision_request\""));
        assert!(json.contains("\"episode\":1"));
        let back: BridgeMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
