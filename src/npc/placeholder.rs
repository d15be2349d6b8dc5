//! Placeholder Substitution Engine.
//!
//! Four tokens are recognised: `{player.id}`, `{player.name}`, `{npc.name}` and
//! `{npc.id}`. Substitution is a single left-to-right pass, so text inserted for
//! one token is never scanned again. Anything else in braces is left verbatim.
//!
//! After substitution a command is classified: `say <msg>` and `chat.say <msg>`
//! make the NPC speak, everything else goes to the command executor.

use crate::npc::types::NpcRecord;

const TOKEN_PLAYER_ID: &str = "{player.id}";
const TOKEN_PLAYER_NAME: &str = "{player.name}";
const TOKEN_NPC_NAME: &str = "{npc.name}";
const TOKEN_NPC_ID: &str = "{npc.id}";

const SAY_PREFIXES: [&str; 2] = ["say ", "chat.say "];

/// Runtime values the tokens expand to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpansionContext {
    pub acting_user_id: String,
    pub acting_user_name: String,
    pub npc_id: String,
    pub npc_name: String,
}

impl ExpansionContext {
    pub fn new(user_id: &str, user_name: &str, npc_id: &str, npc_name: &str) -> Self {
        Self {
            acting_user_id: user_id.to_string(),
            acting_user_name: user_name.to_string(),
            npc_id: npc_id.to_string(),
            npc_name: npc_name.to_string(),
        }
    }

    pub fn for_record(user_id: &str, user_name: &str, record: &NpcRecord) -> Self {
        Self::new(user_id, user_name, &record.id, &record.name)
    }

    fn value_at(&self, rest: &str) -> Option<(&str, usize)> {
        [
            (TOKEN_PLAYER_ID, self.acting_user_id.as_str()),
            (TOKEN_PLAYER_NAME, self.acting_user_name.as_str()),
            (TOKEN_NPC_NAME, self.npc_name.as_str()),
            (TOKEN_NPC_ID, self.npc_id.as_str()),
        ]
        .into_iter()
        .find(|(token, _)| rest.starts_with(token))
        .map(|(token, value)| (value, token.len()))
    }
}

/// Replace every recognised token in `template` with its context value.
pub fn substitute(template: &str, ctx: &ExpansionContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];
        match ctx.value_at(candidate) {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Where an expanded command is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Broadcast as chat attributed to the NPC.
    Say(String),
    /// Forward verbatim to the command executor.
    Command(String),
}

impl Dispatch {
    pub fn classify(command: String) -> Self {
        for prefix in SAY_PREFIXES {
            if let Some(message) = command.strip_prefix(prefix) {
                return Dispatch::Say(message.to_string());
            }
        }
        Dispatch::Command(command)
    }

    pub fn text(&self) -> &str {
        match self {
            Dispatch::Say(s) | Dispatch::Command(s) => s,
        }
    }
}

/// Substitute tokens in `command` and decide where it is routed.
pub fn expand(command: &str, ctx: &ExpansionContext) -> Dispatch {
    Dispatch::classify(substitute(command, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExpansionContext {
        ExpansionContext::new("76561198000000042", "Bob", "npc-1", "Guard")
    }

    #[test]
    fn say_prefix_routes_to_chat() {
        assert_eq!(
            expand("say hi {player.name}", &ctx()),
            Dispatch::Say("hi Bob".to_string())
        );
        assert_eq!(
            expand("chat.say {npc.name} here", &ctx()),
            Dispatch::Say("Guard here".to_string())
        );
    }

    #[test]
    fn tokens_expand_in_any_order() {
        assert_eq!(
            expand("{npc.id} give {player.id} wood 10", &ctx()),
            Dispatch::Command("npc-1 give 76561198000000042 wood 10".to_string())
        );
    }

    #[test]
    fn repeated_and_unknown_tokens() {
        assert_eq!(
            substitute("{player.name}/{player.name} {team} {", &ctx()),
            "Bob/Bob {team} {"
        );
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let c = ExpansionContext::new("1", "{npc.id}", "npc-1", "Guard");
        assert_eq!(substitute("hello {player.name}", &c), "hello {npc.id}");
    }

    #[test]
    fn say_needs_trailing_space() {
        assert_eq!(
            expand("sayonara", &ctx()),
            Dispatch::Command("sayonara".to_string())
        );
        assert_eq!(expand("say ", &ctx()), Dispatch::Say(String::new()));
    }
}
