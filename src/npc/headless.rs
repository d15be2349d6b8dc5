//! In-process host with no game engine behind it.
//!
//! Instances are plain structs, chat and commands are recorded rather than sent.
//! The CLI uses it to preview interactions offline; tests use it to observe what
//! the core asked of its collaborators.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};

use crate::logutil::escape_log;
use crate::npc::errors::NpcError;
use crate::npc::host::{CommandExecutor, Host, InstanceProvider, KitProvider, PermissionChecker};
use crate::npc::types::{InstanceId, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessInstance {
    pub position: Vec3,
    pub orientation: Vec3,
    pub health: f32,
    pub display_name: String,
    pub speaker_id: u64,
    pub prompt: Option<String>,
    pub invulnerable: bool,
    pub destroyed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub speaker_name: String,
    pub speaker_id: u64,
    pub message: String,
}

/// How the headless kit provider answers a give or claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitResponse {
    Accept,
    Decline,
    Fail,
}

impl KitResponse {
    fn answer(self, what: &str) -> Result<bool, NpcError> {
        match self {
            KitResponse::Accept => Ok(true),
            KitResponse::Decline => Ok(false),
            KitResponse::Fail => Err(NpcError::External(format!("{} failed", what))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KitCall {
    Prepare { instance: InstanceId, speaker_id: u64, kit: String },
    Give { instance: InstanceId, kit: String },
    Claim { instance: InstanceId, kit: String, forced: bool },
}

#[derive(Debug)]
pub struct HeadlessKits {
    names: Vec<String>,
    pub give: KitResponse,
    pub claim: KitResponse,
    pub calls: Vec<KitCall>,
    /// Permissions granted to NPC speaker ids while preparing them.
    pub granted: Vec<(u64, String)>,
}

impl HeadlessKits {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|s| s.to_string()).collect(),
            give: KitResponse::Accept,
            claim: KitResponse::Accept,
            calls: Vec::new(),
            granted: Vec::new(),
        }
    }
}

impl KitProvider for HeadlessKits {
    fn prepare_recipient(&mut self, instance: InstanceId, speaker_id: u64, kit: &str) -> Result<(), NpcError> {
        self.granted
            .push((speaker_id, format!("kits.{}", kit.to_lowercase())));
        self.calls.push(KitCall::Prepare {
            instance,
            speaker_id,
            kit: kit.to_string(),
        });
        Ok(())
    }

    fn give_kit(&mut self, instance: InstanceId, kit: &str) -> Result<bool, NpcError> {
        self.calls.push(KitCall::Give {
            instance,
            kit: kit.to_string(),
        });
        self.give.answer("give")
    }

    fn claim_kit(&mut self, instance: InstanceId, kit: &str, forced: bool) -> Result<bool, NpcError> {
        self.calls.push(KitCall::Claim {
            instance,
            kit: kit.to_string(),
            forced,
        });
        self.claim.answer("claim")
    }

    fn kit_names(&self) -> Vec<String> {
        self.names.clone()
    }
}

#[derive(Debug, Default)]
pub struct HeadlessHost {
    next_id: u64,
    instances: BTreeMap<InstanceId, HeadlessInstance>,
    grants: HashMap<String, HashSet<String>>,
    kits: Option<HeadlessKits>,
    fail_spawns: usize,
    pub chat: Vec<ChatLine>,
    pub executed: Vec<String>,
    pub replies: Vec<(String, String)>,
    pub teleports: Vec<(String, Vec3)>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kits(mut self, kits: HeadlessKits) -> Self {
        self.kits = Some(kits);
        self
    }

    pub fn kit_provider(&self) -> Option<&HeadlessKits> {
        self.kits.as_ref()
    }

    pub fn kit_provider_mut(&mut self) -> Option<&mut HeadlessKits> {
        self.kits.as_mut()
    }

    pub fn grant(&mut self, user_id: &str, permission: &str) {
        self.grants
            .entry(user_id.to_string())
            .or_default()
            .insert(permission.to_string());
    }

    /// Make the next `count` instance creations fail.
    pub fn fail_spawns(&mut self, count: usize) {
        self.fail_spawns = count;
    }

    pub fn instance(&self, instance: InstanceId) -> Option<&HeadlessInstance> {
        self.instances.get(&instance)
    }

    pub fn live_instances(&self) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|(_, i)| !i.destroyed)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn move_instance(&mut self, instance: InstanceId, position: Vec3) -> bool {
        match self.instances.get_mut(&instance) {
            Some(i) if !i.destroyed => {
                i.position = position;
                true
            }
            _ => false,
        }
    }

    /// Destroy an instance as the engine would on death.
    pub fn kill(&mut self, instance: InstanceId) -> bool {
        match self.instances.get_mut(&instance) {
            Some(i) if !i.destroyed => {
                i.destroyed = true;
                true
            }
            _ => false,
        }
    }

    fn with_instance(&mut self, instance: InstanceId, f: impl FnOnce(&mut HeadlessInstance)) {
        if let Some(i) = self.instances.get_mut(&instance) {
            f(i);
        }
    }
}

impl InstanceProvider for HeadlessHost {
    fn create_instance(&mut self, position: Vec3, orientation: Vec3) -> Result<InstanceId, NpcError> {
        if self.fail_spawns > 0 {
            self.fail_spawns -= 1;
            return Err(NpcError::External("engine refused to create instance".to_string()));
        }
        self.next_id += 1;
        let id = InstanceId(self.next_id);
        self.instances.insert(
            id,
            HeadlessInstance {
                position,
                orientation,
                health: 0.0,
                display_name: String::new(),
                speaker_id: 0,
                prompt: None,
                invulnerable: false,
                destroyed: false,
            },
        );
        debug!("Headless instance {} created at {}", id, position);
        Ok(id)
    }

    fn destroy_instance(&mut self, instance: InstanceId) {
        self.kill(instance);
    }

    fn is_destroyed(&self, instance: InstanceId) -> bool {
        self.instances.get(&instance).map_or(true, |i| i.destroyed)
    }

    fn instance_position(&self, instance: InstanceId) -> Option<Vec3> {
        self.instances
            .get(&instance)
            .filter(|i| !i.destroyed)
            .map(|i| i.position)
    }

    fn set_health(&mut self, instance: InstanceId, health: f32) {
        self.with_instance(instance, |i| i.health = health);
    }

    fn set_display_name(&mut self, instance: InstanceId, name: &str) {
        self.with_instance(instance, |i| i.display_name = name.to_string());
    }

    fn set_speaker_id(&mut self, instance: InstanceId, speaker_id: u64) {
        self.with_instance(instance, |i| i.speaker_id = speaker_id);
    }

    fn set_interaction_prompt(&mut self, instance: InstanceId, text: &str) {
        self.with_instance(instance, |i| i.prompt = Some(text.to_string()));
    }

    fn set_invulnerable(&mut self, instance: InstanceId, invulnerable: bool) {
        self.with_instance(instance, |i| i.invulnerable = invulnerable);
    }

    fn broadcast_chat(&mut self, message: &str, speaker_name: &str, speaker_id: u64) {
        info!("[chat] {}: {}", escape_log(speaker_name), escape_log(message));
        self.chat.push(ChatLine {
            speaker_name: speaker_name.to_string(),
            speaker_id,
            message: message.to_string(),
        });
    }

    fn send_reply(&mut self, user_id: &str, message: &str) {
        info!("[reply -> {}] {}", user_id, escape_log(message));
        self.replies.push((user_id.to_string(), message.to_string()));
    }

    fn teleport_user(&mut self, user_id: &str, position: Vec3) {
        self.teleports.push((user_id.to_string(), position));
    }
}

impl CommandExecutor for HeadlessHost {
    fn run(&mut self, command: &str) {
        info!("[command] {}", escape_log(command));
        self.executed.push(command.to_string());
    }
}

impl PermissionChecker for HeadlessHost {
    fn user_has_permission(&self, user_id: &str, permission: &str) -> bool {
        self.grants
            .get(user_id)
            .is_some_and(|set| set.contains(permission))
    }
}

impl Host for HeadlessHost {
    fn kits(&mut self) -> Option<&mut dyn KitProvider> {
        self.kits.as_mut().map(|k| k as &mut dyn KitProvider)
    }

    fn has_kits(&self) -> bool {
        self.kits.is_some()
    }
}
