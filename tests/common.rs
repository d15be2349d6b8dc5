//! Test utilities & fixtures.
//! Builds a manager over a throwaway data file and a recording headless host.
#![allow(dead_code)]

use std::time::Duration;

use humannpc::npc::{HeadlessHost, HeadlessKits, ManagerSettings, NpcManager, NpcStore, Vec3};
use tempfile::TempDir;

pub const ADMIN: &str = "76561198000000001";
pub const PLAYER: &str = "76561198000000002";

/// Manager with no kit provider and no kit delay.
pub fn setup() -> (NpcManager<HeadlessHost>, TempDir) {
    setup_with(HeadlessHost::new())
}

pub fn setup_with_kits(kits: HeadlessKits) -> (NpcManager<HeadlessHost>, TempDir) {
    setup_with(HeadlessHost::new().with_kits(kits))
}

pub fn setup_with(host: HeadlessHost) -> (NpcManager<HeadlessHost>, TempDir) {
    let temp = TempDir::new().expect("tempdir");
    let store = NpcStore::open(temp.path().join("npcs.json")).expect("open store");
    let settings = ManagerSettings {
        kit_delay: Duration::ZERO,
        ..ManagerSettings::default()
    };
    (NpcManager::new(store, host, settings), temp)
}

/// Create an interactable NPC at `at` and return its id.
pub fn interactable(manager: &mut NpcManager<HeadlessHost>, name: &str, at: Vec3, commands: &[&str]) -> String {
    let id = manager
        .create_npc(name, at, Vec3::default())
        .expect("create npc");
    manager
        .update_property(&id, "interacttext", "Talk")
        .expect("prompt");
    manager
        .toggle(&id, humannpc::npc::NpcToggle::Interaction)
        .expect("toggle");
    for c in commands {
        manager.add_command(&id, c).expect("add command");
    }
    id
}
