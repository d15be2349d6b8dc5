//! # humannpc - persistent human NPCs with configurable interactions
//!
//! A management core for human-like NPCs in a hosted game world. Each NPC is a
//! persisted record (identity, stats, behavior flags, greetings, an optional
//! equipment kit and an ordered list of interaction commands). Live instances
//! are created and destroyed through a host engine; when a user interacts with
//! an NPC in range, its commands are expanded and either spoken in chat or
//! handed to the host's command executor.
//!
//! ## Features
//!
//! - **Record Store**: one JSON document, atomically rewritten on every mutation.
//! - **Lifecycle**: spawn, despawn, delayed kit application and respawn on death,
//!   with deferred work re-validated when it fires.
//! - **Template Registry**: other providers register reusable command templates.
//! - **Placeholders**: `{player.id}`, `{player.name}`, `{npc.id}`, `{npc.name}`.
//! - **Admin surface**: the `/npc` command and a CLI over a headless host.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use humannpc::npc::{Actor, HeadlessHost, ManagerSettings, NpcManager, NpcStore, NpcToggle, Vec3};
//!
//! fn main() -> Result<(), humannpc::npc::NpcError> {
//!     let store = NpcStore::open("data/humannpc.json")?;
//!     let mut manager = NpcManager::new(store, HeadlessHost::new(), ManagerSettings::default());
//!     manager.start();
//!
//!     let id = manager.create_npc("Guard", Vec3::new(10.0, 0.0, 5.0), Vec3::default())?;
//!     manager.toggle(&id, NpcToggle::Interaction)?;
//!     manager.add_command(&id, "say Welcome, {player.name}!")?;
//!
//!     let actor = Actor::new("76561198000000001", "Alice", Vec3::new(10.0, 0.0, 6.0));
//!     let outcome = manager.interact(&actor);
//!     println!("consumed: {}", outcome.consumed());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`npc`] - records, lifecycle, templates, placeholder expansion, interaction
//! - [`config`] - TOML configuration for the binary
//! - [`logutil`] - log-safe escaping of user-supplied text

pub mod config;
pub mod logutil;
pub mod npc;
