//! Stock example templates, registered the way any other provider would.

use log::info;

use crate::npc::registry::{CommandParameter, ParameterKind, TemplateRegistry};

pub const STOCK_PROVIDER: &str = "NPCCommandExamples";

/// Identifiers registered by [`register_stock_commands`].
pub const STOCK_IDENTIFIERS: [&str; 4] = ["heal", "inventory.giveto", "oxide.grant", "teleportpos"];

/// Register the four stock templates. Returns how many were accepted.
pub fn register_stock_commands(registry: &mut TemplateRegistry) -> usize {
    use ParameterKind::{Number, Player, Text};

    let templates = [
        (
            "heal {player.id}",
            "Heal Player",
            "Fully heals the interacting player",
            vec![],
        ),
        (
            "inventory.giveto",
            "Give Items",
            "Gives items to the player",
            vec![
                CommandParameter::placeholder("player", Player, "{player.id}"),
                CommandParameter::new("item", Text, "wood"),
                CommandParameter::new("amount", Number, "1000"),
            ],
        ),
        (
            "oxide.grant",
            "Grant Permission",
            "Grants a permission to the player",
            vec![
                CommandParameter::new("type", Text, "user"),
                CommandParameter::placeholder("player", Player, "{player.id}"),
                CommandParameter::new("permission", Text, "vip.access"),
            ],
        ),
        (
            "teleportpos",
            "Teleport to Position",
            "Teleports player to specific coordinates",
            vec![
                CommandParameter::placeholder("player", Player, "{player.name}"),
                CommandParameter::new("x", Number, "0"),
                CommandParameter::new("y", Number, "50"),
                CommandParameter::new("z", Number, "0"),
            ],
        ),
    ];

    let count = templates
        .into_iter()
        .filter(|(source, display, description, params)| {
            registry.register(STOCK_PROVIDER, source, display, description, params.clone())
        })
        .count();
    info!("Registered {} stock NPC command(s)", count);
    count
}

pub fn unregister_stock_commands(registry: &mut TemplateRegistry) -> usize {
    STOCK_IDENTIFIERS
        .iter()
        .filter(|id| registry.unregister(STOCK_PROVIDER, id))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_removes_all_four() {
        let mut reg = TemplateRegistry::new();
        assert_eq!(register_stock_commands(&mut reg), 4);
        let give = reg.get("NPCCommandExamples_inventory.giveto").expect("give");
        assert_eq!(give.default_invocation(), "inventory.giveto {player.id} wood 1000");
        let heal = reg.find(STOCK_PROVIDER, "heal").expect("heal");
        assert_eq!(heal.default_invocation(), "heal {player.id}");
        assert_eq!(unregister_stock_commands(&mut reg), 4);
        assert!(reg.is_empty());
    }
}
