//! Persisted NPC record model and the typed edits that can be applied to it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use crc::{Crc, CRC_32_ISO_HDLC};
use serde::{Deserialize, Serialize};

use crate::npc::errors::NpcError;

/// Base of the numeric identity an NPC speaks under. Each record maps into the
/// range above it through [`speaker_id`].
pub const SPEAKER_ID_BASE: u64 = 76_561_198_000_000_000;

/// Command appended by "add command" when no text is supplied.
pub const DEFAULT_INTERACTION_COMMAND: &str = "say Hello {player.name}!";

pub const DEFAULT_NPC_NAME: &str = "New NPC";

const SPEAKER_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Stable numeric identity derived from a record id.
///
/// Not injective: two ids may share a speaker id. The lifecycle controller
/// checks live NPCs for a clash when spawning.
pub fn speaker_id(record_id: &str) -> u64 {
    SPEAKER_ID_BASE + SPEAKER_CRC.checksum(record_id.as_bytes()) as u64
}

/// Three-component real vector used for positions and orientations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Parses `x,y,z` (whitespace around components allowed). Components must be finite.
impl FromStr for Vec3 {
    type Err = NpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(NpcError::InvalidInput(format!(
                "expected x,y,z but got '{}'",
                s
            )));
        }
        let mut out = [0f32; 3];
        for (slot, part) in out.iter_mut().zip(parts) {
            *slot = parse_finite(part)
                .ok_or_else(|| NpcError::InvalidInput(format!("not a number: '{}'", part)))?;
        }
        Ok(Vec3::new(out[0], out[1], out[2]))
    }
}

/// JSON has no encoding for NaN or infinity, so those count as unparseable.
fn parse_finite(text: &str) -> Option<f32> {
    text.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Handle of a live instance owned by the external engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Persisted configuration for one NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NpcRecord {
    pub id: String,
    pub name: String,
    pub health: f32,
    pub position: Vec3,
    pub orientation: Vec3,
    pub hostile: bool,
    pub always_hostile: bool,
    pub invulnerable: bool,
    pub lootable: bool,
    pub radius: f32,
    pub attack_distance: f32,
    pub max_distance: f32,
    pub speed: f32,
    pub damage_amount: f32,
    pub damage_distance: f32,
    pub damage_interval: f32,
    pub respawn: bool,
    pub respawn_delay_seconds: f32,
    /// Empty string means no loadout.
    pub kit_name: String,
    // Reserved message lists, carried through persistence only.
    pub hello_messages: Vec<String>,
    pub bye_messages: Vec<String>,
    pub use_messages: Vec<String>,
    pub hurt_messages: Vec<String>,
    pub kill_messages: Vec<String>,
    pub allow_interaction: bool,
    pub interaction_distance: f32,
    pub interaction_text: String,
    pub interaction_commands: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Correlation to the currently spawned instance. Never persisted.
    #[serde(skip)]
    pub live_instance: Option<InstanceId>,
}

impl Default for NpcRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: DEFAULT_NPC_NAME.to_string(),
            health: 100.0,
            position: Vec3::default(),
            orientation: Vec3::default(),
            hostile: false,
            always_hostile: false,
            invulnerable: false,
            lootable: true,
            radius: 10.0,
            attack_distance: 30.0,
            max_distance: 40.0,
            speed: 5.0,
            damage_amount: 10.0,
            damage_distance: 5.0,
            damage_interval: 2.0,
            respawn: true,
            respawn_delay_seconds: 60.0,
            kit_name: String::new(),
            hello_messages: Vec::new(),
            bye_messages: Vec::new(),
            use_messages: Vec::new(),
            hurt_messages: Vec::new(),
            kill_messages: Vec::new(),
            allow_interaction: false,
            interaction_distance: 3.0,
            interaction_text: "Press E to interact".to_string(),
            interaction_commands: Vec::new(),
            created_at: DateTime::<Utc>::default(),
            live_instance: None,
        }
    }
}

impl NpcRecord {
    pub fn new(id: &str, name: &str, position: Vec3, orientation: Vec3) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            position,
            orientation,
            created_at: Utc::now(),
            ..Self::default()
        }
    }

    pub fn has_kit(&self) -> bool {
        !self.kit_name.is_empty()
    }

    pub fn speaker_id(&self) -> u64 {
        speaker_id(&self.id)
    }
}

/// A single field-level edit of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum NpcField {
    Name(String),
    Health(f32),
    Speed(f32),
    Kit(String),
    InteractionDistance(f32),
    InteractionText(String),
    RespawnDelay(f32),
    Position(Vec3),
    Orientation(Vec3),
}

impl NpcField {
    /// Parse an edit from a property name and raw text value.
    ///
    /// Unparseable or non-finite numbers yield `Ok(None)` so the caller keeps
    /// the previous value. Unknown properties are rejected.
    pub fn parse(property: &str, value: &str) -> Result<Option<NpcField>, NpcError> {
        let number = || parse_finite(value);
        let field = match property.to_ascii_lowercase().as_str() {
            "name" => Some(NpcField::Name(value.to_string())),
            "health" => number().map(NpcField::Health),
            "speed" => number().map(NpcField::Speed),
            "kit" => Some(NpcField::Kit(value.to_string())),
            "interactdist" => number().map(NpcField::InteractionDistance),
            "interacttext" => Some(NpcField::InteractionText(value.to_string())),
            "respawntime" => number().map(NpcField::RespawnDelay),
            "position" => value.parse().ok().map(NpcField::Position),
            "orientation" => value.parse().ok().map(NpcField::Orientation),
            other => {
                return Err(NpcError::InvalidInput(format!(
                    "unknown property '{}'",
                    other
                )))
            }
        };
        Ok(field)
    }

    pub fn apply(self, record: &mut NpcRecord) {
        match self {
            NpcField::Name(v) => record.name = v,
            NpcField::Health(v) => record.health = v,
            NpcField::Speed(v) => record.speed = v,
            NpcField::Kit(v) => record.kit_name = v,
            NpcField::InteractionDistance(v) => record.interaction_distance = v,
            NpcField::InteractionText(v) => record.interaction_text = v,
            NpcField::RespawnDelay(v) => record.respawn_delay_seconds = v,
            NpcField::Position(v) => record.position = v,
            NpcField::Orientation(v) => record.orientation = v,
        }
    }
}

/// Boolean behaviour flags that can be flipped in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcToggle {
    Hostile,
    AlwaysHostile,
    Invulnerable,
    Lootable,
    Respawn,
    Interaction,
}

impl NpcToggle {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hostile" => Some(NpcToggle::Hostile),
            "alwayshostile" => Some(NpcToggle::AlwaysHostile),
            "invulnerable" => Some(NpcToggle::Invulnerable),
            "lootable" => Some(NpcToggle::Lootable),
            "respawn" => Some(NpcToggle::Respawn),
            "interaction" => Some(NpcToggle::Interaction),
            _ => None,
        }
    }

    /// Flip the flag and return its new value.
    pub fn apply(self, record: &mut NpcRecord) -> bool {
        let flag = match self {
            NpcToggle::Hostile => &mut record.hostile,
            NpcToggle::AlwaysHostile => &mut record.always_hostile,
            NpcToggle::Invulnerable => &mut record.invulnerable,
            NpcToggle::Lootable => &mut record.lootable,
            NpcToggle::Respawn => &mut record.respawn,
            NpcToggle::Interaction => &mut record.allow_interaction,
        };
        *flag = !*flag;
        *flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_uses_documented_defaults() {
        let rec = NpcRecord::new("abc", "Guard", Vec3::new(1.0, 2.0, 3.0), Vec3::default());
        assert_eq!(rec.health, 100.0);
        assert!(rec.lootable);
        assert!(rec.respawn);
        assert_eq!(rec.respawn_delay_seconds, 60.0);
        assert!(!rec.allow_interaction);
        assert_eq!(rec.interaction_distance, 3.0);
        assert_eq!(rec.interaction_text, "Press E to interact");
        assert!(rec.kit_name.is_empty());
        assert!(rec.live_instance.is_none());
    }

    #[test]
    fn vec3_parses_and_measures() {
        let v: Vec3 = " 3, 4 ,0".parse().expect("parse");
        assert_eq!(v.distance(&Vec3::default()), 5.0);
        assert!("1,2".parse::<Vec3>().is_err());
        assert!("1,b,2".parse::<Vec3>().is_err());
        assert!("1,NaN,2".parse::<Vec3>().is_err());
        assert!("inf,0,0".parse::<Vec3>().is_err());
    }

    #[test]
    fn numeric_parse_failure_skips_field() {
        assert_eq!(NpcField::parse("health", "lots").unwrap(), None);
        assert_eq!(
            NpcField::parse("HEALTH", "250").unwrap(),
            Some(NpcField::Health(250.0))
        );
        assert!(NpcField::parse("colour", "red").is_err());
        assert_eq!(NpcField::parse("speed", "NaN").unwrap(), None);
        assert_eq!(NpcField::parse("interactdist", "-inf").unwrap(), None);
        assert_eq!(NpcField::parse("position", "0,inf,0").unwrap(), None);
    }

    #[test]
    fn toggle_flips_and_reports() {
        let mut rec = NpcRecord::default();
        assert!(NpcToggle::Interaction.apply(&mut rec));
        assert!(rec.allow_interaction);
        assert!(!NpcToggle::Respawn.apply(&mut rec));
        assert!(!rec.respawn);
    }

    #[test]
    fn speaker_id_is_stable_and_offset() {
        let a = speaker_id("3f0c7c1e-0000-4000-8000-000000000001");
        assert_eq!(a, speaker_id("3f0c7c1e-0000-4000-8000-000000000001"));
        assert!(a >= SPEAKER_ID_BASE);
    }

    #[test]
    fn live_instance_is_not_persisted() {
        let mut rec = NpcRecord::new("id1", "Bob", Vec3::default(), Vec3::default());
        rec.live_instance = Some(InstanceId(9));
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"interactionCommands\""));
        let back: NpcRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.live_instance, None);
    }
}
