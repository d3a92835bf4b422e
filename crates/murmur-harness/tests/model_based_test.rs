//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! sync engines, relay store and key directory behave like the reference
//! model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld    RealWorld      Compare
//!      (reference)   (SimEnv)       Results
//! ```

#![allow(clippy::unwrap_used)]

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use murmur_client::{ClientError, ConversationEntry, MemoryStateStore, SyncConfig, SyncEngine};
use murmur_core::{KeyDirectory, MemoryDirectory};
use murmur_harness::{
    ClientId, FaultMode, FaultyRelay, ModelMessage, ModelWorld, ObservableState, Operation,
    OperationError, OperationResult, SimEnv, SmallMessage,
};
use murmur_proto::ParticipantId;
use murmur_server::{DEFAULT_MAX_ENVELOPE_BYTES, MailboxStore};
use proptest::prelude::*;
use tokio::runtime::Runtime;

type SimRelay = Arc<FaultyRelay<MailboxStore<SimEnv>>>;
type Engine = SyncEngine<SimEnv, SimRelay, MemoryStateStore>;

/// Real system wrapper that mirrors ModelWorld's interface.
struct RealWorld {
    runtime: Runtime,
    env: SimEnv,
    relay: SimRelay,
    ids: Vec<ParticipantId>,
    engines: Vec<Engine>,
}

fn participant(client: usize) -> ParticipantId {
    ParticipantId::new(format!("c{client}")).unwrap()
}

fn client_of(participant: &ParticipantId) -> ClientId {
    participant.as_str()[1..].parse().unwrap()
}

impl RealWorld {
    fn new(num_clients: usize, seed: u64) -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let env = SimEnv::with_seed(seed);
        let directory: Arc<dyn KeyDirectory> = Arc::new(MemoryDirectory::new());
        let store = MailboxStore::new(env.clone(), DEFAULT_MAX_ENVELOPE_BYTES);
        let relay = Arc::new(FaultyRelay::new(store));

        let ids: Vec<_> = (0..num_clients).map(participant).collect();
        let engines = ids
            .iter()
            .map(|id| {
                SyncEngine::new(
                    env.clone(),
                    id.clone(),
                    Arc::clone(&directory),
                    Arc::clone(&relay),
                    MemoryStateStore::new(),
                    SyncConfig::default(),
                )
                .unwrap()
            })
            .collect();

        Self { runtime, env, relay, ids, engines }
    }

    fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::SendMessage { from, to, content } => self.apply_send(*from, *to, content),
            Operation::Tick { client_id } => self.apply_tick(*client_id),
            Operation::SetRelayFault { mode } => {
                self.relay.set_mode(*mode);
                OperationResult::Ok
            },
            Operation::AdvanceTime { millis } => {
                self.env.advance(Duration::from_millis(u64::from(*millis)));
                OperationResult::Ok
            },
        }
    }

    fn apply_send(
        &mut self,
        from: ClientId,
        to: ClientId,
        content: &SmallMessage,
    ) -> OperationResult {
        let (from, to) = (usize::from(from), usize::from(to));
        if from >= self.engines.len() || to >= self.engines.len() {
            return OperationResult::Error(OperationError::InvalidClient);
        }
        if from == to {
            return OperationResult::Error(OperationError::SelfMessage);
        }

        let recipient = self.ids[to].clone();
        let engine = &mut self.engines[from];
        match self.runtime.block_on(engine.send_message(&recipient, content.to_text())) {
            Ok(_) => OperationResult::Ok,
            Err(ClientError::EmptyMessage) => OperationResult::Error(OperationError::EmptyMessage),
            Err(_) => OperationResult::Error(OperationError::RelayUnavailable),
        }
    }

    fn apply_tick(&mut self, client_id: ClientId) -> OperationResult {
        let Some(engine) = self.engines.get_mut(usize::from(client_id)) else {
            return OperationResult::Error(OperationError::InvalidClient);
        };

        let report = self.runtime.block_on(engine.tick());
        assert_eq!(report.rejected, 0, "honest traffic must always open");
        if report.poll_error.is_some() {
            OperationResult::Error(OperationError::RelayUnavailable)
        } else {
            OperationResult::Ok
        }
    }

    fn observable_state(&self) -> ObservableState {
        let outbox_lens = self.engines.iter().map(SyncEngine::outbox_len).collect();
        let client_threads = self
            .engines
            .iter()
            .map(|engine| {
                let me = engine.participant();
                let mut threads: BTreeMap<ClientId, Vec<ModelMessage>> = BTreeMap::new();
                for entries in engine.log().threads().values() {
                    for entry in entries {
                        let peer = if entry.from == *me { &entry.to } else { &entry.from };
                        threads.entry(client_of(peer)).or_default().push(ModelMessage {
                            from: client_of(&entry.from),
                            to: client_of(&entry.to),
                            text: entry.text.clone(),
                        });
                    }
                }
                threads
                    .into_iter()
                    .map(|(peer, messages)| (peer, ObservableState::canonical_thread(messages)))
                    .collect()
            })
            .collect();
        let relay_pending = self.ids.iter().map(|id| self.relay.inner().pending(id)).collect();

        ObservableState { outbox_lens, client_threads, relay_pending }
    }

    fn entries(&self) -> Vec<Vec<ConversationEntry>> {
        self.engines
            .iter()
            .map(|engine| engine.log().threads().values().flatten().cloned().collect())
            .collect()
    }

    /// Invariants the model cannot see: ordering, id uniqueness and that a
    /// received entry is byte-for-byte the sender's copy.
    fn check_log_invariants(&self) {
        for engine in &self.engines {
            for entries in engine.log().threads().values() {
                for pair in entries.windows(2) {
                    assert!(pair[0].timestamp <= pair[1].timestamp, "thread out of order");
                    assert_ne!(pair[0].id, pair[1].id);
                }
                let mut ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                assert_eq!(ids.len(), entries.len(), "duplicate id in thread");
            }

            for entries in engine.log().threads().values() {
                for entry in entries.iter().filter(|e| e.to == *engine.participant()) {
                    let sender = &self.engines[usize::from(client_of(&entry.from))];
                    let own_copy = sender.get_thread(&entry.to).iter().find(|e| e.id == entry.id);
                    assert_eq!(own_copy, Some(entry), "recipient copy differs from sender copy");
                }
            }
        }
    }
}

/// Strategy for generating SmallMessage.
fn small_message_strategy() -> impl Strategy<Value = SmallMessage> {
    (any::<u8>(), any::<u8>()).prop_map(|(seed, size_class)| SmallMessage { seed, size_class })
}

fn fault_strategy() -> impl Strategy<Value = FaultMode> {
    prop_oneof![
        4 => Just(FaultMode::Healthy),
        1 => Just(FaultMode::Down),
        1 => Just(FaultMode::Hang),
    ]
}

/// Strategy for generating operations; client ids are clamped later.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        5 => (any::<u8>(), any::<u8>(), small_message_strategy())
            .prop_map(|(from, to, content)| Operation::SendMessage { from, to, content }),
        4 => any::<u8>().prop_map(|client_id| Operation::Tick { client_id }),
        1 => fault_strategy().prop_map(|mode| Operation::SetRelayFault { mode }),
        1 => any::<u16>().prop_map(|millis| Operation::AdvanceTime { millis }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Results and observable state match the model after every operation.
    #[test]
    fn prop_model_matches_real(
        seed in any::<u64>(),
        num_clients in 2..5usize,
        ops in prop::collection::vec(operation_strategy(), 0..40)
    ) {
        let mut model = ModelWorld::new(num_clients);
        let mut real = RealWorld::new(num_clients, seed);

        for (i, op) in ops.into_iter().enumerate() {
            let op = op.clamp(num_clients);
            let model_result = model.apply(&op);
            let real_result = real.apply(&op);

            prop_assert_eq!(
                &model_result,
                &real_result,
                "Divergence at operation {}: {:?}",
                i,
                op
            );
            prop_assert_eq!(model.observable_state(), real.observable_state());
        }

        real.check_log_invariants();
    }

    /// Once the relay heals and everyone ticks twice, every sent message
    /// is in both parties' threads.
    #[test]
    fn prop_everything_delivered_after_recovery(
        seed in any::<u64>(),
        num_clients in 2..5usize,
        ops in prop::collection::vec(operation_strategy(), 0..40)
    ) {
        let mut real = RealWorld::new(num_clients, seed);
        for op in ops {
            real.apply(&op.clamp(num_clients));
        }

        real.apply(&Operation::SetRelayFault { mode: FaultMode::Healthy });
        for _ in 0..2 {
            for client_id in 0..num_clients {
                let client_id = ClientId::try_from(client_id).unwrap();
                let tick = Operation::Tick { client_id };
                prop_assert!(real.apply(&tick).is_ok());
            }
        }

        let state = real.observable_state();
        prop_assert!(state.outbox_lens.iter().all(|&n| n == 0));
        prop_assert!(state.relay_pending.iter().all(|&n| n == 0));
        for (client, threads) in state.client_threads.iter().enumerate() {
            let client = ClientId::try_from(client).unwrap();
            for (peer, messages) in threads {
                let mirror = &state.client_threads[usize::from(*peer)];
                let theirs = mirror.iter().find(|(p, _)| *p == client).map(|(_, m)| m);
                prop_assert_eq!(Some(messages), theirs);
            }
        }
        real.check_log_invariants();
    }
}

#[test]
fn same_seed_replays_identically() {
    let ops: Vec<Operation> = (0..30u8)
        .map(|i| match i % 3 {
            0 => Operation::SendMessage {
                from: i,
                to: i / 3,
                content: SmallMessage { seed: i, size_class: i },
            },
            1 => Operation::Tick { client_id: i },
            _ => Operation::AdvanceTime { millis: u16::from(i) * 100 },
        })
        .map(|op| op.clamp(3))
        .collect();

    let run = |seed| {
        let mut world = RealWorld::new(3, seed);
        for op in &ops {
            world.apply(op);
        }
        world.entries()
    };

    let first = run(11);
    assert!(first.iter().any(|entries| !entries.is_empty()));
    assert_eq!(first, run(11));
    assert_ne!(first, run(12));
}
