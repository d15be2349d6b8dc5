//! NPC Lifecycle Controller.
//!
//! Per record: `Unspawned → Spawning → Live → (Dying → Unspawned)`.
//!
//! Each record slot carries a generation that moves on every transition.
//! Deferred tasks (respawn after death, kit after spawn) capture the generation
//! they were scheduled under and do nothing if the slot has moved on or the
//! record is gone by the time they fire.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::logutil::escape_log;
use crate::npc::errors::NpcError;
use crate::npc::host::Host;
use crate::npc::scheduler::DeferredQueue;
use crate::npc::store::NpcStore;
use crate::npc::types::{InstanceId, NpcRecord};

/// Delay between spawning an instance and applying its kit.
pub const DEFAULT_KIT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnState {
    #[default]
    Unspawned,
    Spawning,
    Live(InstanceId),
    /// Instance removed, respawn pending.
    Dying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleTask {
    Respawn {
        record_id: String,
        generation: u64,
    },
    ApplyKit {
        record_id: String,
        instance: InstanceId,
        generation: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitOutcome {
    Given,
    Claimed,
    Failed,
    Unavailable,
}

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    state: SpawnState,
    generation: u64,
}

impl Slot {
    fn transition(&mut self, state: SpawnState) -> u64 {
        self.state = state;
        self.generation += 1;
        self.generation
    }
}

#[derive(Debug)]
pub struct Lifecycle {
    slots: HashMap<String, Slot>,
    by_instance: HashMap<InstanceId, String>,
    queue: DeferredQueue<LifecycleTask>,
    kit_delay: Duration,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(DEFAULT_KIT_DELAY)
    }
}

impl Lifecycle {
    pub fn new(kit_delay: Duration) -> Self {
        Self {
            slots: HashMap::new(),
            by_instance: HashMap::new(),
            queue: DeferredQueue::new(),
            kit_delay,
        }
    }

    pub fn state(&self, record_id: &str) -> SpawnState {
        self.slots.get(record_id).map(|s| s.state).unwrap_or_default()
    }

    pub fn record_for(&self, instance: InstanceId) -> Option<&str> {
        self.by_instance.get(&instance).map(String::as_str)
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.queue.next_due()
    }

    /// Create a live instance for the record. A record that is already live keeps
    /// its instance.
    pub fn spawn<H: Host>(
        &mut self,
        store: &mut NpcStore,
        host: &mut H,
        record_id: &str,
        now: Instant,
    ) -> Result<InstanceId, NpcError> {
        let record = store.get(record_id)?.clone();
        if let SpawnState::Live(existing) = self.state(record_id) {
            if !host.is_destroyed(existing) {
                debug!("NPC {} already live as {}", record_id, existing);
                return Ok(existing);
            }
            self.unbind(store, record_id, existing);
        }

        self.slot(record_id).transition(SpawnState::Spawning);
        self.warn_on_speaker_clash(store, &record);

        let instance = match host.create_instance(record.position, record.orientation) {
            Ok(i) => i,
            Err(e) => {
                self.slot(record_id).transition(SpawnState::Unspawned);
                warn!("Failed to spawn NPC '{}': {}", escape_log(&record.name), e);
                return Err(NpcError::External(format!(
                    "instance creation failed for {}: {}",
                    record_id, e
                )));
            }
        };

        host.set_speaker_id(instance, record.speaker_id());
        host.set_display_name(instance, &record.name);
        host.set_health(instance, record.health);
        if record.invulnerable {
            host.set_invulnerable(instance, true);
        }
        if record.allow_interaction && !record.interaction_text.is_empty() {
            host.set_interaction_prompt(instance, &record.interaction_text);
        }

        store.bind_instance(record_id, Some(instance));
        self.by_instance.insert(instance, record_id.to_string());
        let generation = self.slot(record_id).transition(SpawnState::Live(instance));

        if record.has_kit() {
            if host.has_kits() {
                self.queue.schedule(
                    now,
                    self.kit_delay,
                    LifecycleTask::ApplyKit {
                        record_id: record_id.to_string(),
                        instance,
                        generation,
                    },
                );
            } else {
                debug!(
                    "Kit '{}' for NPC '{}' skipped: no kit provider",
                    escape_log(&record.kit_name),
                    escape_log(&record.name)
                );
            }
        }

        info!("Spawned NPC '{}' ({}) as {}", escape_log(&record.name), record_id, instance);
        Ok(instance)
    }

    /// Destroy the bound instance, if any. Also voids a pending respawn.
    pub fn despawn<H: Host>(&mut self, store: &mut NpcStore, host: &mut H, record_id: &str) -> bool {
        let bound = match self.state(record_id) {
            SpawnState::Live(i) => Some(i),
            _ => store.get(record_id).ok().and_then(|r| r.live_instance),
        };
        let was_pending = self.state(record_id) == SpawnState::Dying;
        if let Some(slot) = self.slots.get_mut(record_id) {
            slot.transition(SpawnState::Unspawned);
        }
        let Some(instance) = bound else {
            return was_pending;
        };
        if !host.is_destroyed(instance) {
            host.destroy_instance(instance);
        }
        self.unbind(store, record_id, instance);
        debug!("Despawned NPC {} ({})", record_id, instance);
        true
    }

    pub fn despawn_all<H: Host>(&mut self, store: &mut NpcStore, host: &mut H) -> usize {
        let ids: Vec<String> = self.slots.keys().cloned().collect();
        ids.iter()
            .filter(|id| self.despawn(store, host, id))
            .count()
    }

    /// Drop all lifecycle state for a record being deleted.
    pub fn forget(&mut self, record_id: &str) {
        self.slots.remove(record_id);
        self.by_instance.retain(|_, id| id != record_id);
    }

    /// The engine reports an instance gone (death). Schedules a respawn when the
    /// record asks for one. Returns the backing record id.
    pub fn on_instance_removed(
        &mut self,
        store: &mut NpcStore,
        instance: InstanceId,
        now: Instant,
    ) -> Option<String> {
        let record_id = self.by_instance.get(&instance)?.clone();
        self.unbind(store, &record_id, instance);

        let Ok(record) = store.get(&record_id) else {
            self.slots.remove(&record_id);
            return Some(record_id);
        };

        if record.respawn {
            let delay = respawn_delay(record);
            let generation = self.slot(&record_id).transition(SpawnState::Dying);
            self.queue.schedule(
                now,
                delay,
                LifecycleTask::Respawn {
                    record_id: record_id.clone(),
                    generation,
                },
            );
            info!(
                "NPC '{}' removed; respawning in {:.1}s",
                escape_log(&record.name),
                delay.as_secs_f32()
            );
        } else {
            self.slot(&record_id).transition(SpawnState::Unspawned);
            debug!("NPC '{}' removed; respawn disabled", escape_log(&record.name));
        }
        Some(record_id)
    }

    /// Damage suppression query for the engine.
    pub fn is_invulnerable(&self, store: &NpcStore, instance: InstanceId) -> bool {
        self.record_for(instance)
            .and_then(|id| store.get(id).ok())
            .is_some_and(|r| r.invulnerable)
    }

    /// Run every deferred task due at `now`. Returns how many acted.
    pub fn run_due<H: Host>(&mut self, store: &mut NpcStore, host: &mut H, now: Instant) -> usize {
        let mut acted = 0;
        for task in self.queue.pop_due(now) {
            match task {
                LifecycleTask::Respawn {
                    record_id,
                    generation,
                } => {
                    if !store.contains(&record_id) {
                        debug!("Respawn for deleted NPC {} dropped", record_id);
                        continue;
                    }
                    if !self.is_current(&record_id, generation, SpawnState::Dying) {
                        debug!("Stale respawn for NPC {} dropped", record_id);
                        continue;
                    }
                    if self.spawn(store, host, &record_id, now).is_ok() {
                        acted += 1;
                    }
                }
                LifecycleTask::ApplyKit {
                    record_id,
                    instance,
                    generation,
                } => {
                    if !self.is_current(&record_id, generation, SpawnState::Live(instance))
                        || host.is_destroyed(instance)
                    {
                        debug!("Kit for NPC {} dropped: instance gone", record_id);
                        continue;
                    }
                    let Ok(record) = store.get(&record_id) else {
                        continue;
                    };
                    apply_kit(host, record, instance);
                    acted += 1;
                }
            }
        }
        acted
    }

    fn is_current(&self, record_id: &str, generation: u64, state: SpawnState) -> bool {
        self.slots
            .get(record_id)
            .is_some_and(|s| s.generation == generation && s.state == state)
    }

    fn slot(&mut self, record_id: &str) -> &mut Slot {
        self.slots.entry(record_id.to_string()).or_default()
    }

    fn unbind(&mut self, store: &mut NpcStore, record_id: &str, instance: InstanceId) {
        self.by_instance.remove(&instance);
        store.bind_instance(record_id, None);
    }

    fn warn_on_speaker_clash(&self, store: &NpcStore, record: &NpcRecord) {
        let speaker = record.speaker_id();
        for id in self.by_instance.values() {
            if id == &record.id {
                continue;
            }
            if let Ok(other) = store.get(id) {
                if other.speaker_id() == speaker {
                    warn!(
                        "NPC '{}' shares speaker id {} with live NPC '{}'",
                        escape_log(&record.name),
                        speaker,
                        escape_log(&other.name)
                    );
                }
            }
        }
    }
}

fn respawn_delay(record: &NpcRecord) -> Duration {
    Duration::try_from_secs_f32(record.respawn_delay_seconds.max(0.0)).unwrap_or(Duration::ZERO)
}

/// Give the record's kit to a live instance, falling back to a claim.
pub fn apply_kit<H: Host>(host: &mut H, record: &NpcRecord, instance: InstanceId) -> KitOutcome {
    let Some(kits) = host.kits() else {
        return KitOutcome::Unavailable;
    };
    let kit = record.kit_name.as_str();
    let name = escape_log(&record.name);

    if let Err(e) = kits.prepare_recipient(instance, record.speaker_id(), kit) {
        warn!("Preparing kit '{}' for NPC '{}' failed: {}", kit, name, e);
    }

    if let Ok(true) = kits.give_kit(instance, kit) {
        info!("Successfully gave kit '{}' to NPC '{}'", kit, name);
        return KitOutcome::Given;
    }

    debug!("Regular give of kit '{}' failed, trying claim", kit);
    match kits.claim_kit(instance, kit, false) {
        Ok(true) => {
            info!("Successfully claimed kit '{}' for NPC '{}'", kit, name);
            KitOutcome::Claimed
        }
        Ok(false) => {
            warn!(
                "Failed to give kit '{}' to NPC '{}' - kit may have a cost or requirements",
                kit, name
            );
            KitOutcome::Failed
        }
        Err(e) => {
            warn!(
                "Failed to give kit '{}' to NPC '{}' - check kit configuration ({})",
                kit, name, e
            );
            KitOutcome::Failed
        }
    }
}
