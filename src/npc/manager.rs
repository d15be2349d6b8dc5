//! `NpcManager` owns every piece of NPC state: the record store, the template
//! registry, the lifecycle controller, browser sessions and the host
//! collaborators. All operations run on the caller's thread; deferred work only
//! happens inside [`NpcManager::tick`].

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::logutil::escape_log;
use crate::npc::browser::BrowserSessions;
use crate::npc::errors::NpcError;
use crate::npc::host::Host;
use crate::npc::interaction::{handle_interact, Actor, InteractionOutcome};
use crate::npc::lifecycle::{Lifecycle, SpawnState, DEFAULT_KIT_DELAY};
use crate::npc::registry::{CommandParameter, CommandTemplate, TemplateRegistry};
use crate::npc::store::NpcStore;
use crate::npc::types::{
    InstanceId, NpcField, NpcRecord, NpcToggle, Vec3, DEFAULT_INTERACTION_COMMAND,
};

pub const PERMISSION_ADMIN: &str = "humannpc.admin";

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub kit_delay: Duration,
    pub admin_permission: String,
    pub respawn_delay_seconds: f32,
    pub interaction_distance: f32,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            kit_delay: DEFAULT_KIT_DELAY,
            admin_permission: PERMISSION_ADMIN.to_string(),
            respawn_delay_seconds: 60.0,
            interaction_distance: 3.0,
        }
    }
}

pub struct NpcManager<H: Host> {
    store: NpcStore,
    registry: TemplateRegistry,
    lifecycle: Lifecycle,
    sessions: BrowserSessions,
    host: H,
    settings: ManagerSettings,
}

impl<H: Host> NpcManager<H> {
    pub fn new(store: NpcStore, host: H, settings: ManagerSettings) -> Self {
        Self {
            store,
            registry: TemplateRegistry::new(),
            lifecycle: Lifecycle::new(settings.kit_delay),
            sessions: BrowserSessions::new(),
            host,
            settings,
        }
    }

    pub fn store(&self) -> &NpcStore {
        &self.store
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.registry
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn sessions(&self) -> &BrowserSessions {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut BrowserSessions {
        &mut self.sessions
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn has_permission(&self, user_id: &str, permission: &str) -> bool {
        self.host.user_has_permission(user_id, permission)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.has_permission(user_id, &self.settings.admin_permission)
    }

    pub fn require_admin(&self, user_id: &str) -> Result<(), NpcError> {
        if self.is_admin(user_id) {
            Ok(())
        } else {
            Err(NpcError::PermissionDenied(format!(
                "{} lacks {}",
                user_id, self.settings.admin_permission
            )))
        }
    }

    // ---- process lifecycle ----------------------------------------------

    /// Report kit availability once and spawn every stored record.
    pub fn start(&mut self) -> usize {
        if self.host.has_kits() {
            info!("Kit provider found; kit selection enabled");
        } else {
            warn!("Kit provider not found; kit functionality disabled");
        }
        self.spawn_all()
    }

    /// Close every browser session, despawn every NPC and drop registered templates.
    pub fn shutdown(&mut self) -> usize {
        let users = self.sessions.close_all();
        if !users.is_empty() {
            info!("Closed {} open NPC panel(s)", users.len());
        }
        let despawned = self.lifecycle.despawn_all(&mut self.store, &mut self.host);
        self.registry.clear();
        despawned
    }

    pub fn spawn_all(&mut self) -> usize {
        let now = Instant::now();
        self.store
            .ids()
            .iter()
            .filter(|id| {
                self.lifecycle
                    .spawn(&mut self.store, &mut self.host, id, now)
                    .is_ok()
            })
            .count()
    }

    /// Run deferred respawns and kit applications due at `now`.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.lifecycle.run_due(&mut self.store, &mut self.host, now)
    }

    // ---- record lifecycle -----------------------------------------------

    pub fn spawn(&mut self, record_id: &str) -> Result<InstanceId, NpcError> {
        self.lifecycle
            .spawn(&mut self.store, &mut self.host, record_id, Instant::now())
    }

    pub fn despawn(&mut self, record_id: &str) -> bool {
        self.lifecycle.despawn(&mut self.store, &mut self.host, record_id)
    }

    pub fn state(&self, record_id: &str) -> SpawnState {
        self.lifecycle.state(record_id)
    }

    /// Persist a new record and spawn it. A failed spawn leaves the record stored.
    pub fn create_npc(&mut self, name: &str, position: Vec3, orientation: Vec3) -> Result<String, NpcError> {
        let (respawn, distance) = (
            self.settings.respawn_delay_seconds,
            self.settings.interaction_distance,
        );
        let id = self.store.create_with(name, position, orientation, |r| {
            r.respawn_delay_seconds = respawn;
            r.interaction_distance = distance;
        })?;
        if let Err(e) = self.spawn(&id) {
            warn!("NPC '{}' created but not spawned: {}", escape_log(name), e);
        }
        Ok(id)
    }

    pub fn create_at(&mut self, actor: &Actor, name: &str) -> Result<String, NpcError> {
        self.create_npc(name, actor.position, actor.orientation)
    }

    pub fn find(&self, token: &str) -> Option<&NpcRecord> {
        self.store.find_by_id_or_name(token)
    }

    /// Despawn and delete the record matched by id or name substring.
    pub fn delete_npc(&mut self, token: &str) -> Result<NpcRecord, NpcError> {
        let record = self
            .find(token)
            .cloned()
            .ok_or_else(|| NpcError::NotFound(format!("npc: {}", token)))?;
        self.despawn(&record.id);
        self.store.delete(&record.id)?;
        self.lifecycle.forget(&record.id);
        self.sessions.drop_record(&record.id);
        info!("Deleted NPC '{}' ({})", escape_log(&record.name), record.id);
        Ok(record)
    }

    /// Despawn if live, spawn from the current record, persist.
    pub fn save_and_respawn(&mut self, record_id: &str) -> Result<InstanceId, NpcError> {
        self.store.get(record_id)?;
        self.despawn(record_id);
        let instance = self.spawn(record_id)?;
        self.store.save()?;
        Ok(instance)
    }

    pub fn teleport_to(&mut self, user_id: &str, token: &str) -> Result<NpcRecord, NpcError> {
        let record = self
            .find(token)
            .cloned()
            .ok_or_else(|| NpcError::NotFound(format!("npc: {}", token)))?;
        self.host.teleport_user(user_id, record.position);
        Ok(record)
    }

    // ---- record editing -------------------------------------------------

    /// Parse and apply `property = value`. Unparseable numbers keep the old value.
    pub fn update_property(
        &mut self,
        record_id: &str,
        property: &str,
        value: &str,
    ) -> Result<&NpcRecord, NpcError> {
        let field = NpcField::parse(property, value)?;
        self.store.update_field(record_id, field)
    }

    pub fn toggle(&mut self, record_id: &str, toggle: NpcToggle) -> Result<bool, NpcError> {
        self.store.update(record_id, |r| toggle.apply(r))
    }

    pub fn select_kit(&mut self, record_id: &str, kit: &str) -> Result<(), NpcError> {
        self.store
            .update(record_id, |r| r.kit_name = kit.to_string())
    }

    pub fn clear_kit(&mut self, record_id: &str) -> Result<(), NpcError> {
        self.store.update(record_id, |r| r.kit_name.clear())
    }

    pub fn available_kits(&mut self) -> Vec<String> {
        self.host.kits().map(|k| k.kit_names()).unwrap_or_default()
    }

    // ---- interaction command list ----------------------------------------

    pub fn add_command(&mut self, record_id: &str, command: &str) -> Result<usize, NpcError> {
        self.store.update(record_id, |r| {
            r.interaction_commands.push(command.to_string());
            r.interaction_commands.len()
        })
    }

    pub fn add_default_command(&mut self, record_id: &str) -> Result<usize, NpcError> {
        self.add_command(record_id, DEFAULT_INTERACTION_COMMAND)
    }

    /// Remove the command at `index`. Out-of-range indexes change nothing.
    pub fn remove_command(&mut self, record_id: &str, index: usize) -> Result<bool, NpcError> {
        if index >= self.store.get(record_id)?.interaction_commands.len() {
            return Ok(false);
        }
        self.store.update(record_id, |r| {
            r.interaction_commands.remove(index);
        })?;
        Ok(true)
    }

    /// Replace the command at `index`. Out-of-range indexes change nothing.
    pub fn update_command(&mut self, record_id: &str, index: usize, command: &str) -> Result<bool, NpcError> {
        if index >= self.store.get(record_id)?.interaction_commands.len() {
            return Ok(false);
        }
        self.store.update(record_id, |r| {
            r.interaction_commands[index] = command.to_string();
        })?;
        Ok(true)
    }

    /// Append a template's default invocation. Returns the template's display name.
    pub fn add_template(&mut self, record_id: &str, template_key: &str) -> Result<String, NpcError> {
        self.store.get(record_id)?;
        let template = self.registry.get(template_key).ok_or_else(|| {
            NpcError::NotFound(format!(
                "template: {} (available: {})",
                template_key,
                self.registry.keys().join(", ")
            ))
        })?;
        let command = template.default_invocation();
        let display = template.display_name.clone();
        self.add_command(record_id, &command)?;
        info!("Added command to {}: {}", record_id, escape_log(&command));
        Ok(display)
    }

    // ---- provider API ---------------------------------------------------

    pub fn register_command(
        &mut self,
        provider: &str,
        source: &str,
        display_name: &str,
        description: &str,
        parameters: Vec<CommandParameter>,
    ) -> bool {
        self.registry
            .register(provider, source, display_name, description, parameters)
    }

    pub fn register_command_raw(
        &mut self,
        provider: &str,
        source: &str,
        display_name: &str,
        description: &str,
        parameters: &[serde_json::Value],
    ) -> bool {
        self.registry
            .register_raw(provider, source, display_name, description, parameters)
    }

    pub fn unregister_command(&mut self, provider: &str, identifier: &str) -> bool {
        self.registry.unregister(provider, identifier)
    }

    pub fn list_commands(&self) -> Vec<&CommandTemplate> {
        self.registry.list_all()
    }

    // ---- engine events --------------------------------------------------

    pub fn interact(&mut self, actor: &Actor) -> InteractionOutcome {
        handle_interact(&self.store, &mut self.host, actor)
    }

    pub fn on_instance_removed(&mut self, instance: InstanceId) -> Option<String> {
        self.lifecycle
            .on_instance_removed(&mut self.store, instance, Instant::now())
    }

    pub fn is_invulnerable(&self, instance: InstanceId) -> bool {
        self.lifecycle.is_invulnerable(&self.store, instance)
    }
}
