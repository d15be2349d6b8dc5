//! Human NPC management core.
//! Records persist to a single JSON document; live instances, templates and
//! browser sessions exist only in memory and are owned by [`NpcManager`].

pub mod browser;
pub mod commands;
pub mod errors;
pub mod headless;
pub mod host;
pub mod interaction;
pub mod lifecycle;
pub mod manager;
pub mod placeholder;
pub mod registry;
pub mod scheduler;
pub mod stock;
pub mod store;
pub mod types;

pub use browser::{BrowserSessions, Panel, ProviderGroup};
pub use commands::{handle_npc_command, NpcCommand};
pub use errors::NpcError;
pub use headless::{HeadlessHost, HeadlessKits, KitResponse};
pub use host::{CommandExecutor, Host, InstanceProvider, KitProvider, PermissionChecker};
pub use interaction::{handle_interact, Actor, InteractionOutcome};
pub use lifecycle::{KitOutcome, Lifecycle, SpawnState};
pub use manager::{ManagerSettings, NpcManager, PERMISSION_ADMIN};
pub use placeholder::{expand, substitute, Dispatch, ExpansionContext};
pub use registry::{CommandParameter, CommandTemplate, ParameterKind, TemplateKey, TemplateRegistry};
pub use stock::{register_stock_commands, STOCK_PROVIDER};
pub use store::NpcStore;
pub use types::*;
