//! Interaction Trigger: a user pressed "interact" somewhere in the world.
//!
//! Target selection walks records in store order and takes the first live,
//! interactable NPC within its own interaction distance, not the nearest one.

use log::debug;

use crate::logutil::escape_log;
use crate::npc::host::{Host, InstanceProvider};
use crate::npc::placeholder::{expand, Dispatch, ExpansionContext};
use crate::npc::store::NpcStore;
use crate::npc::types::{InstanceId, NpcRecord, Vec3};

/// The user performing an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: String,
    pub display_name: String,
    pub position: Vec3,
    pub orientation: Vec3,
}

impl Actor {
    pub fn new(user_id: &str, display_name: &str, position: Vec3) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            position,
            orientation: Vec3::default(),
        }
    }

    pub fn facing(mut self, orientation: Vec3) -> Self {
        self.orientation = orientation;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
    /// No NPC in range; the host should handle the input normally.
    Ignored,
    /// Matched an NPC with no commands configured.
    Acknowledged { record_id: String },
    /// Matched an NPC and dispatched its commands in order.
    Executed {
        record_id: String,
        dispatched: Vec<Dispatch>,
    },
}

impl InteractionOutcome {
    /// Whether the triggering input was consumed.
    pub fn consumed(&self) -> bool {
        !matches!(self, InteractionOutcome::Ignored)
    }

    pub fn record_id(&self) -> Option<&str> {
        match self {
            InteractionOutcome::Ignored => None,
            InteractionOutcome::Acknowledged { record_id }
            | InteractionOutcome::Executed { record_id, .. } => Some(record_id),
        }
    }
}

/// First record (store order) whose live instance is interactable and in range.
pub fn find_target<'a, E: InstanceProvider + ?Sized>(
    store: &'a NpcStore,
    engine: &E,
    position: &Vec3,
) -> Option<(&'a NpcRecord, InstanceId)> {
    store.list_all().iter().find_map(|record| {
        let instance = record.live_instance?;
        if !record.allow_interaction || engine.is_destroyed(instance) {
            return None;
        }
        let at = engine.instance_position(instance)?;
        (position.distance(&at) <= record.interaction_distance).then_some((record, instance))
    })
}

pub fn handle_interact<H: Host>(store: &NpcStore, host: &mut H, actor: &Actor) -> InteractionOutcome {
    let Some((record, _instance)) = find_target(store, &*host, &actor.position) else {
        return InteractionOutcome::Ignored;
    };

    if record.interaction_commands.is_empty() {
        host.send_reply(
            &actor.user_id,
            &format!("Interacted with {} (No commands configured)", record.name),
        );
        return InteractionOutcome::Acknowledged {
            record_id: record.id.clone(),
        };
    }

    let ctx = ExpansionContext::for_record(&actor.user_id, &actor.display_name, record);
    let dispatched = run_commands(host, record, &ctx);
    InteractionOutcome::Executed {
        record_id: record.id.clone(),
        dispatched,
    }
}

/// Expand and dispatch the record's commands in list order. A command never
/// prevents the ones after it from running.
pub fn run_commands<H: Host>(host: &mut H, record: &NpcRecord, ctx: &ExpansionContext) -> Vec<Dispatch> {
    let mut dispatched = Vec::with_capacity(record.interaction_commands.len());
    for raw in &record.interaction_commands {
        if raw.is_empty() {
            continue;
        }
        let dispatch = expand(raw, ctx);
        match &dispatch {
            Dispatch::Say(message) if message.is_empty() => continue,
            Dispatch::Say(message) => {
                host.broadcast_chat(message, &record.name, record.speaker_id());
            }
            Dispatch::Command(command) => {
                debug!("NPC '{}' runs: {}", escape_log(&record.name), escape_log(command));
                host.run(command);
            }
        }
        dispatched.push(dispatch);
    }
    dispatched
}
