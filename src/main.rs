//! Binary entrypoint for the humannpc CLI.
//!
//! Commands:
//! - `init` - write a starter `humannpc.toml` and an empty data file
//! - `create <name> [--at x,y,z] [--facing x,y,z]` - add an NPC record
//! - `list`, `show`, `set`, `toggle`, `delete` - inspect and edit records
//! - `add-command`, `remove-command`, `add-template`, `templates` - interaction commands
//! - `interact --user-id --user-name --at x,y,z` - fire one interaction against a headless host
//! - `admin <user-id> [args...]` - run the `/npc` chat command as the given user
//!
//! Nothing here talks to a game engine; live instances exist only for the
//! duration of one invocation. See the library crate docs for the core: `humannpc::npc`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use humannpc::config::Config;
use humannpc::npc::{
    handle_npc_command, register_stock_commands, Actor, Dispatch, HeadlessHost, InteractionOutcome,
    NpcManager, NpcStore, NpcToggle, Vec3,
};

#[derive(Parser)]
#[command(name = "humannpc")]
#[command(about = "Manage persistent human NPCs and their interaction commands")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "humannpc.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file and an empty data file
    Init,
    /// Create a new NPC record
    Create {
        name: String,
        /// Position as x,y,z
        #[arg(long, default_value = "0,0,0")]
        at: Vec3,
        /// Orientation as x,y,z
        #[arg(long, default_value = "0,0,0")]
        facing: Vec3,
    },
    /// Delete an NPC by id or name
    Delete { target: String },
    /// List every stored NPC
    List,
    /// Print one NPC record as JSON
    Show { target: String },
    /// Set a property (name, health, speed, kit, interactdist, interacttext, respawntime)
    Set {
        target: String,
        property: String,
        value: String,
    },
    /// Flip a flag (hostile, alwayshostile, invulnerable, lootable, respawn, interaction)
    Toggle { target: String, flag: String },
    /// Append an interaction command; with no text the default greeting is used
    AddCommand {
        target: String,
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Remove an interaction command by zero-based index
    RemoveCommand { target: String, index: usize },
    /// List registered command templates
    Templates,
    /// Append a template's default invocation (key is provider_identifier)
    AddTemplate { target: String, key: String },
    /// Spawn every NPC headlessly and fire one interaction
    Interact {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        at: Vec3,
    },
    /// Run the /npc chat command as a user
    Admin {
        user_id: String,
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => init(&cli.config).await,
        command => {
            let config = match pre_config {
                Some(cfg) => cfg,
                None => {
                    warn!("No configuration at {}; using defaults", cli.config);
                    Config::default()
                }
            };
            run(command, &config)
        }
    }
}

async fn init(config_path: &str) -> Result<()> {
    info!("Initializing new humannpc configuration");
    Config::create_default(config_path).await?;
    info!("Configuration file created at {}", config_path);
    let cfg = Config::default();
    let store = NpcStore::open(&cfg.storage.data_file)?;
    store.save()?;
    println!("Created {} and {}", config_path, cfg.storage.data_file);
    Ok(())
}

fn run(command: Commands, config: &Config) -> Result<()> {
    let mut manager = build_manager(config)?;

    match command {
        Commands::Init => {}
        Commands::Create { name, at, facing } => {
            let id = manager.create_npc(&name, at, facing)?;
            println!("Created NPC '{}' with ID: {}", name, id);
        }
        Commands::Delete { target } => {
            let record = manager.delete_npc(&target)?;
            println!("Deleted NPC '{}'", record.name);
        }
        Commands::List => {
            let records = manager.store().list_all();
            if records.is_empty() {
                println!("No NPCs found.");
            }
            for r in records {
                println!(
                    "{}  {}  at {}  commands: {}",
                    r.id,
                    r.name,
                    r.position,
                    r.interaction_commands.len()
                );
            }
        }
        Commands::Show { target } => {
            let id = resolve(&manager, &target)?;
            let record = manager.store().get(&id)?;
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        Commands::Set {
            target,
            property,
            value,
        } => {
            let id = resolve(&manager, &target)?;
            let record = manager.update_property(&id, &property, &value)?;
            println!("Updated '{}'", record.name);
        }
        Commands::Toggle { target, flag } => {
            let id = resolve(&manager, &target)?;
            let toggle = NpcToggle::parse(&flag).ok_or_else(|| anyhow!("Unknown flag: {}", flag))?;
            let value = manager.toggle(&id, toggle)?;
            println!("{} is now {}", flag, value);
        }
        Commands::AddCommand { target, command } => {
            let id = resolve(&manager, &target)?;
            let count = if command.is_empty() {
                manager.add_default_command(&id)?
            } else {
                manager.add_command(&id, &command.join(" "))?
            };
            println!("NPC now has {} command(s)", count);
        }
        Commands::RemoveCommand { target, index } => {
            let id = resolve(&manager, &target)?;
            if manager.remove_command(&id, index)? {
                println!("Removed command {}", index);
            } else {
                println!("No command at index {}", index);
            }
        }
        Commands::Templates => {
            for (provider, templates) in manager.registry().grouped() {
                println!("{}", provider);
                for t in templates {
                    println!("  {}  {}  -> {}", t.key, t.display_name, t.default_invocation());
                }
            }
        }
        Commands::AddTemplate { target, key } => {
            let id = resolve(&manager, &target)?;
            let display = manager.add_template(&id, &key)?;
            println!("Added '{}'", display);
        }
        Commands::Interact {
            user_id,
            user_name,
            at,
        } => {
            let spawned = manager.start();
            info!("Spawned {} NPC(s) headlessly", spawned);
            let actor = Actor::new(&user_id, &user_name, at);
            match manager.interact(&actor) {
                InteractionOutcome::Ignored => println!("No NPC in range."),
                InteractionOutcome::Acknowledged { .. } => {
                    for (_, reply) in &manager.host().replies {
                        println!("{}", reply);
                    }
                }
                InteractionOutcome::Executed { dispatched, .. } => {
                    for d in dispatched {
                        match d {
                            Dispatch::Say(text) => println!("say: {}", text),
                            Dispatch::Command(cmd) => println!("run: {}", cmd),
                        }
                    }
                }
            }
            manager.shutdown();
        }
        Commands::Admin { user_id, args } => {
            let position = manager
                .store()
                .list_all()
                .first()
                .map(|r| r.position)
                .unwrap_or_default();
            let actor = Actor::new(&user_id, &user_id, position);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            for line in handle_npc_command(&mut manager, &actor, &args) {
                println!("{}", line);
            }
            for (user, pos) in &manager.host().teleports {
                println!("(teleported {} to {})", user, pos);
            }
        }
    }

    Ok(())
}

fn build_manager(config: &Config) -> Result<NpcManager<HeadlessHost>> {
    let store = NpcStore::open(&config.storage.data_file)?;
    let mut host = HeadlessHost::new();
    for (user, perms) in &config.permissions.grants {
        for perm in perms {
            host.grant(user, perm);
        }
    }
    let mut manager = NpcManager::new(store, host, config.manager_settings());
    if config.templates.stock_examples {
        register_stock_commands(manager.registry_mut());
    }
    Ok(manager)
}

fn resolve(manager: &NpcManager<HeadlessHost>, token: &str) -> Result<String> {
    manager
        .find(token)
        .map(|r| r.id.clone())
        .ok_or_else(|| anyhow!("NPC not found: {}", token))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let open_append = |path: &String| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    };
    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(open_append);
    let security_path = config
        .as_ref()
        .and_then(|c| c.logging.security_file.clone());
    let log_mutex = log_file.map(|f| std::sync::Arc::new(std::sync::Mutex::new(f)));
    // With a log file, the console only gets output when attached to a terminal
    let to_console = log_mutex.is_none() || atty::is(atty::Stream::Stdout);
    builder.format(move |fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{} [{}] {}", ts, record.level(), record.args());
        if let Some(ref write_mutex) = log_mutex {
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
        }
        if record.target() == "security" {
            if let Some(ref sec_path) = security_path {
                if let Ok(mut sf) = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(sec_path)
                {
                    let _ = writeln!(sf, "{}", line);
                }
            }
        }
        if to_console {
            writeln!(fmt, "{}", line)
        } else {
            Ok(())
        }
    });
    let _ = builder.try_init();
}
