//! Collaborator seams between the NPC core and the hosting game server.
//!
//! The core never owns live instances. It asks the engine to create and destroy
//! them, remembers which record an instance belongs to, and hands expanded
//! commands to an executor. Each concern is its own trait; [`Host`] bundles them
//! so the manager can hold a single value.

use crate::npc::errors::NpcError;
use crate::npc::types::{InstanceId, Vec3};

/// Creates, decorates and destroys live NPC instances.
pub trait InstanceProvider {
    fn create_instance(&mut self, position: Vec3, orientation: Vec3) -> Result<InstanceId, NpcError>;

    fn destroy_instance(&mut self, instance: InstanceId);

    fn is_destroyed(&self, instance: InstanceId) -> bool;

    /// Current world position, `None` once the instance is gone.
    fn instance_position(&self, instance: InstanceId) -> Option<Vec3>;

    fn set_health(&mut self, instance: InstanceId, health: f32);

    fn set_display_name(&mut self, instance: InstanceId, name: &str);

    fn set_speaker_id(&mut self, instance: InstanceId, speaker_id: u64);

    fn set_interaction_prompt(&mut self, instance: InstanceId, text: &str);

    fn set_invulnerable(&mut self, instance: InstanceId, invulnerable: bool);

    /// Public chat line attributed to a speaker.
    fn broadcast_chat(&mut self, message: &str, speaker_name: &str, speaker_id: u64);

    /// Private reply to one user.
    fn send_reply(&mut self, user_id: &str, message: &str);

    fn teleport_user(&mut self, user_id: &str, position: Vec3);
}

/// Loadout provider. Optional: when absent kit features are disabled.
pub trait KitProvider {
    /// Make the recipient eligible (permission grant, cooldown and use counters reset).
    fn prepare_recipient(
        &mut self,
        _instance: InstanceId,
        _speaker_id: u64,
        _kit: &str,
    ) -> Result<(), NpcError> {
        Ok(())
    }

    fn give_kit(&mut self, instance: InstanceId, kit: &str) -> Result<bool, NpcError>;

    fn claim_kit(&mut self, instance: InstanceId, kit: &str, forced: bool) -> Result<bool, NpcError>;

    /// Kit names offered for selection.
    fn kit_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Fire-and-forget server command sink.
pub trait CommandExecutor {
    fn run(&mut self, command: &str);
}

pub trait PermissionChecker {
    fn user_has_permission(&self, user_id: &str, permission: &str) -> bool;
}

/// Everything the manager needs from the hosting server.
pub trait Host: InstanceProvider + CommandExecutor + PermissionChecker {
    fn kits(&mut self) -> Option<&mut dyn KitProvider>;

    fn has_kits(&self) -> bool;
}
