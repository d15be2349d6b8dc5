//! Per-user template browser state: which panel a user has open and which
//! provider groups they have expanded. Transient; nothing here is persisted.

use std::collections::{HashMap, HashSet};

use crate::npc::registry::{CommandTemplate, TemplateRegistry};

/// Panels a user can have open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    Main,
    Edit { record_id: String },
    Commands { record_id: String },
    Templates { record_id: String },
}

/// One provider group as presented to a particular user.
#[derive(Debug)]
pub struct ProviderGroup<'a> {
    pub provider: &'a str,
    pub expanded: bool,
    pub templates: Vec<&'a CommandTemplate>,
}

#[derive(Debug, Default)]
pub struct BrowserSessions {
    open: HashMap<String, Panel>,
    expanded: HashMap<String, HashSet<String>>,
}

impl BrowserSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `panel` for the user, replacing whatever was open.
    pub fn open(&mut self, user_id: &str, panel: Panel) -> Option<Panel> {
        self.open.insert(user_id.to_string(), panel)
    }

    pub fn close(&mut self, user_id: &str) -> Option<Panel> {
        self.open.remove(user_id)
    }

    pub fn current(&self, user_id: &str) -> Option<&Panel> {
        self.open.get(user_id)
    }

    pub fn open_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.open.keys().cloned().collect();
        users.sort();
        users
    }

    /// Close every open panel, returning the affected users.
    pub fn close_all(&mut self) -> Vec<String> {
        let users = self.open_users();
        self.open.clear();
        self.expanded.clear();
        users
    }

    /// Flip a provider group; returns true when it is now expanded.
    pub fn toggle_provider(&mut self, user_id: &str, provider: &str) -> bool {
        let set = self.expanded.entry(user_id.to_string()).or_default();
        if set.remove(provider) {
            false
        } else {
            set.insert(provider.to_string());
            true
        }
    }

    pub fn is_expanded(&self, user_id: &str, provider: &str) -> bool {
        self.expanded
            .get(user_id)
            .is_some_and(|set| set.contains(provider))
    }

    /// Registry contents grouped for `user_id`, with their expanded flags.
    pub fn groups_for<'a>(&self, user_id: &str, registry: &'a TemplateRegistry) -> Vec<ProviderGroup<'a>> {
        registry
            .grouped()
            .into_iter()
            .map(|(provider, templates)| ProviderGroup {
                provider,
                expanded: self.is_expanded(user_id, provider),
                templates,
            })
            .collect()
    }

    /// Forget panels that point at a deleted record.
    pub fn drop_record(&mut self, record_id: &str) {
        self.open.retain(|_, panel| match panel {
            Panel::Main => true,
            Panel::Edit { record_id: id }
            | Panel::Commands { record_id: id }
            | Panel::Templates { record_id: id } => id != record_id,
        });
    }
}
