//! Template Registry: reusable interaction commands contributed by other features.
//!
//! Templates are keyed by `(provider, identifier)` where the identifier is the
//! leading verb of the command source. Two sources sharing a verb from the same
//! provider collide and the later registration replaces the earlier one in place.
//! The registry lives only as long as the process; providers register again on
//! every start.

use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logutil::escape_log;
use crate::npc::placeholder::{substitute, ExpansionContext};

/// What a template parameter stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Player,
    Text,
    Number,
}

impl ParameterKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "player" => Some(ParameterKind::Player),
            "text" => Some(ParameterKind::Text),
            "number" => Some(ParameterKind::Number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub default_value: String,
    /// When set, `default_value` holds placeholder tokens expanded at invocation time.
    pub is_placeholder: bool,
}

impl CommandParameter {
    pub fn new(name: &str, kind: ParameterKind, default_value: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default_value: default_value.to_string(),
            is_placeholder: false,
        }
    }

    pub fn placeholder(name: &str, kind: ParameterKind, default_value: &str) -> Self {
        Self {
            is_placeholder: true,
            ..Self::new(name, kind, default_value)
        }
    }

    /// Validate one loosely-typed parameter entry.
    ///
    /// Accepts a JSON object with optional `name`, `type`, `default` and
    /// `placeholder` members. Returns `None` when the shape is wrong.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = match obj.get("name") {
            None | Some(Value::Null) => String::new(),
            Some(v) => scalar_to_string(v)?,
        };
        let kind = match obj.get("type") {
            None | Some(Value::Null) => ParameterKind::Text,
            Some(Value::String(s)) => ParameterKind::parse(s)?,
            Some(_) => return None,
        };
        let default_value = match obj.get("default") {
            None | Some(Value::Null) => String::new(),
            Some(v) => scalar_to_string(v)?,
        };
        let is_placeholder = match obj.get("placeholder") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return None,
        };
        Some(Self {
            name,
            kind,
            default_value,
            is_placeholder,
        })
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Registry key. Its flattened form `provider_identifier` is what user-facing
/// surfaces pass around.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub provider: String,
    pub identifier: String,
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.provider, self.identifier)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandTemplate {
    pub key: TemplateKey,
    /// Full command text as registered, e.g. `heal {player.id}`.
    pub source: String,
    pub display_name: String,
    pub description: String,
    pub parameters: Vec<CommandParameter>,
}

impl CommandTemplate {
    pub fn provider(&self) -> &str {
        &self.key.provider
    }

    pub fn identifier(&self) -> &str {
        &self.key.identifier
    }

    /// Command string stored on a record when the template is picked: the source
    /// followed by every parameter default, placeholders left unexpanded.
    pub fn default_invocation(&self) -> String {
        build_default_invocation(self)
    }

    /// Like [`default_invocation`](Self::default_invocation) but placeholder
    /// defaults are expanded against `ctx`.
    pub fn invocation_for(&self, ctx: &ExpansionContext) -> String {
        let mut command = self.source.clone();
        for param in &self.parameters {
            command.push(' ');
            if param.is_placeholder {
                command.push_str(&substitute(&param.default_value, ctx));
            } else {
                command.push_str(&param.default_value);
            }
        }
        command
    }
}

pub fn build_default_invocation(template: &CommandTemplate) -> String {
    let mut command = template.source.clone();
    for param in &template.parameters {
        command.push(' ');
        command.push_str(&param.default_value);
    }
    command
}

/// Leading whitespace-delimited token of a command source.
pub fn command_identifier(source: &str) -> Option<&str> {
    source.split_whitespace().next()
}

#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<CommandTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Register or overwrite a template. Fails only when `source` has no token.
    pub fn register(
        &mut self,
        provider: &str,
        source: &str,
        display_name: &str,
        description: &str,
        parameters: Vec<CommandParameter>,
    ) -> bool {
        let Some(identifier) = command_identifier(source) else {
            warn!(
                "Cannot register command with empty command name from {}",
                escape_log(provider)
            );
            return false;
        };
        let key = TemplateKey {
            provider: provider.to_string(),
            identifier: identifier.to_string(),
        };
        let template = CommandTemplate {
            key: key.clone(),
            source: source.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            parameters,
        };
        info!(
            "Registered command: {} from {} with key: {}",
            escape_log(display_name),
            escape_log(provider),
            key
        );
        match self.templates.iter_mut().find(|t| t.key == key) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
        true
    }

    /// Register with loosely-typed parameter entries, skipping malformed ones.
    pub fn register_raw(
        &mut self,
        provider: &str,
        source: &str,
        display_name: &str,
        description: &str,
        parameters: &[Value],
    ) -> bool {
        let mut typed = Vec::with_capacity(parameters.len());
        for (idx, raw) in parameters.iter().enumerate() {
            match CommandParameter::from_value(raw) {
                Some(p) => typed.push(p),
                None => warn!(
                    "Ignoring malformed parameter #{} for '{}' from {}",
                    idx,
                    escape_log(source),
                    escape_log(provider)
                ),
            }
        }
        self.register(provider, source, display_name, description, typed)
    }

    /// Remove the template registered under `identifier`, matched verbatim.
    pub fn unregister(&mut self, provider: &str, identifier: &str) -> bool {
        let before = self.templates.len();
        self.templates
            .retain(|t| !(t.key.provider == provider && t.key.identifier == identifier));
        let removed = self.templates.len() != before;
        if removed {
            info!(
                "Unregistered command: {} from {}",
                escape_log(identifier),
                escape_log(provider)
            );
        }
        removed
    }

    pub fn find(&self, provider: &str, identifier: &str) -> Option<&CommandTemplate> {
        self.templates
            .iter()
            .find(|t| t.key.provider == provider && t.key.identifier == identifier)
    }

    /// Look a template up by its flattened `provider_identifier` key.
    pub fn get(&self, flat_key: &str) -> Option<&CommandTemplate> {
        self.templates.iter().find(|t| t.key.to_string() == flat_key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.key.to_string()).collect()
    }

    /// All templates, providers alphabetical, registration order within a provider.
    pub fn list_all(&self) -> Vec<&CommandTemplate> {
        let mut all: Vec<&CommandTemplate> = self.templates.iter().collect();
        all.sort_by(|a, b| a.key.provider.cmp(&b.key.provider));
        all
    }

    /// Templates grouped by provider in presentation order.
    pub fn grouped(&self) -> Vec<(&str, Vec<&CommandTemplate>)> {
        let mut groups: Vec<(&str, Vec<&CommandTemplate>)> = Vec::new();
        for template in self.list_all() {
            let continues = groups
                .last()
                .is_some_and(|(provider, _)| *provider == template.provider());
            if continues {
                if let Some((_, items)) = groups.last_mut() {
                    items.push(template);
                }
            } else {
                groups.push((template.provider(), vec![template]));
            }
        }
        groups
    }

    pub fn clear(&mut self) {
        self.templates.clear();
    }
}
