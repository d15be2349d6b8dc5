//! The `npc` chat command available to administrators.
//!
//! ```text
//! /npc                       open the main panel
//! /npc create [name...]      create an NPC where the caller stands
//! /npc delete <id|name>      despawn and delete
//! /npc list                  list every stored NPC
//! /npc tp <id|name>          teleport the caller to an NPC
//! ```

use log::info;

use crate::npc::browser::Panel;
use crate::npc::host::Host;
use crate::npc::interaction::Actor;
use crate::npc::manager::NpcManager;
use crate::npc::types::DEFAULT_NPC_NAME;

pub const USAGE: &str = "Usage: /npc [create|delete|list|tp] [name/id]";
pub const NO_PERMISSION: &str = "You don't have permission to use this command.";
pub const NOT_FOUND: &str = "NPC not found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpcCommand {
    OpenPanel,
    Create(String),
    Delete(String),
    List,
    Teleport(String),
    Usage,
}

impl NpcCommand {
    pub fn parse(args: &[&str]) -> Self {
        let Some(verb) = args.first() else {
            return NpcCommand::OpenPanel;
        };
        let target = args.get(1).map(|s| s.to_string());
        match verb.to_ascii_lowercase().as_str() {
            "create" => {
                let name = args[1..].join(" ");
                if name.is_empty() {
                    NpcCommand::Create(DEFAULT_NPC_NAME.to_string())
                } else {
                    NpcCommand::Create(name)
                }
            }
            "delete" => target.map_or(NpcCommand::Usage, NpcCommand::Delete),
            "list" => NpcCommand::List,
            "tp" => target.map_or(NpcCommand::Usage, NpcCommand::Teleport),
            _ => NpcCommand::Usage,
        }
    }
}

/// Run `/npc <args>` for `actor` and return the reply lines.
pub fn handle_npc_command<H: Host>(manager: &mut NpcManager<H>, actor: &Actor, args: &[&str]) -> Vec<String> {
    if let Err(e) = manager.require_admin(&actor.user_id) {
        info!(target: "security", "Denied /npc: {}", e);
        return vec![NO_PERMISSION.to_string()];
    }

    match NpcCommand::parse(args) {
        NpcCommand::OpenPanel => {
            manager.sessions_mut().open(&actor.user_id, Panel::Main);
            Vec::new()
        }
        NpcCommand::Create(name) => match manager.create_at(actor, &name) {
            Ok(id) => vec![format!("Created NPC '{}' with ID: {}", name, id)],
            Err(e) => vec![format!("Failed to create NPC: {}", e)],
        },
        NpcCommand::Delete(token) => match manager.delete_npc(&token) {
            Ok(record) => vec![format!("Deleted NPC '{}'", record.name)],
            Err(e) if e.is_user_facing() => vec![NOT_FOUND.to_string()],
            Err(e) => vec![format!("Failed to delete NPC: {}", e)],
        },
        NpcCommand::List => list_lines(manager),
        NpcCommand::Teleport(token) => match manager.teleport_to(&actor.user_id, &token) {
            Ok(record) => vec![format!("Teleported to NPC '{}'", record.name)],
            Err(_) => vec![NOT_FOUND.to_string()],
        },
        NpcCommand::Usage => vec![USAGE.to_string()],
    }
}

fn list_lines<H: Host>(manager: &NpcManager<H>) -> Vec<String> {
    let records = manager.store().list_all();
    if records.is_empty() {
        return vec!["No NPCs found.".to_string()];
    }
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push("=== NPC List ===".to_string());
    for r in records {
        lines.push(format!("- {} (ID: {}) - Health: {}", r.name, r.id, r.health));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbs() {
        assert_eq!(NpcCommand::parse(&[]), NpcCommand::OpenPanel);
        assert_eq!(
            NpcCommand::parse(&["create", "Old", "Tom"]),
            NpcCommand::Create("Old Tom".into())
        );
        assert_eq!(
            NpcCommand::parse(&["CREATE"]),
            NpcCommand::Create(DEFAULT_NPC_NAME.into())
        );
        assert_eq!(NpcCommand::parse(&["delete"]), NpcCommand::Usage);
        assert_eq!(NpcCommand::parse(&["tp", "abc"]), NpcCommand::Teleport("abc".into()));
        assert_eq!(NpcCommand::parse(&["dance"]), NpcCommand::Usage);
    }
}
