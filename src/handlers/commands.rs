//! Command parsing and the response-eligibility gate
//!
//! Quick commands are plain keywords every member can use. Admin
//! commands carry arguments and are parsed before the AI ever sees
//! the message. Everything here is pure string handling.

use crate::config::BotConfig;

/// Keyword commands available to every member of an active group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickCommand {
    Help,
    GroupId,
    TodayStores,
    Summary,
    OpenOrder,
    CloseOrder,
}

/// Commands reserved for group admins, considered only while no
/// ordering session is open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    BindAdmin { code: String },
    UnbindAdmin,
    SetStore { name: String },
    AddStore { name: String },
    RemoveStore { name: String },
    ClearStores,
}

/// Keyword commands in the one-on-one conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonalCommand {
    Help,
    MyGroups,
    MyOrders,
    MyPreferences,
    ClearPreferences,
}

fn normalized(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn parse_quick_command(text: &str) -> Option<QuickCommand> {
    match normalized(text).as_str() {
        "help" => Some(QuickCommand::Help),
        "id" | "group id" => Some(QuickCommand::GroupId),
        "stores" | "menu" | "today" => Some(QuickCommand::TodayStores),
        "summary" | "orders" => Some(QuickCommand::Summary),
        "open order" | "start order" => Some(QuickCommand::OpenOrder),
        "close order" | "end order" => Some(QuickCommand::CloseOrder),
        _ => None,
    }
}

pub fn parse_admin_command(text: &str) -> Option<AdminCommand> {
    let raw = text.trim();

    // Arguments keep their original casing; group codes are case sensitive.
    if let Some(rest) = strip_prefix_ci(raw, "bind admin ") {
        return non_empty(rest).map(|code| AdminCommand::BindAdmin { code });
    }
    if raw.eq_ignore_ascii_case("unbind admin") {
        return Some(AdminCommand::UnbindAdmin);
    }
    if let Some(rest) = strip_prefix_ci(raw, "set store ") {
        return non_empty(rest).map(|name| AdminCommand::SetStore { name });
    }
    if let Some(rest) = strip_prefix_ci(raw, "add store ") {
        return non_empty(rest).map(|name| AdminCommand::AddStore { name });
    }
    if let Some(rest) = strip_prefix_ci(raw, "remove store ") {
        return non_empty(rest).map(|name| AdminCommand::RemoveStore { name });
    }
    if raw.eq_ignore_ascii_case("clear stores") || raw.eq_ignore_ascii_case("clear store") {
        return Some(AdminCommand::ClearStores);
    }
    None
}

fn strip_prefix_ci<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    if raw.len() < prefix.len() || !raw.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, rest) = raw.split_at(prefix.len());
    if head.eq_ignore_ascii_case(prefix) {
        Some(rest)
    } else {
        None
    }
}

pub fn parse_personal_command(text: &str) -> Option<PersonalCommand> {
    match normalized(text).as_str() {
        "help" => Some(PersonalCommand::Help),
        "my groups" | "groups" => Some(PersonalCommand::MyGroups),
        "my orders" | "history" => Some(PersonalCommand::MyOrders),
        "my preferences" | "preferences" => Some(PersonalCommand::MyPreferences),
        "clear preferences" => Some(PersonalCommand::ClearPreferences),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Whether a free-form group message should reach the AI.
/// While an ordering session is open every message is in scope; when the
/// group is idle only messages naming the bot or a trigger word are.
pub fn should_respond(text: &str, session_open: bool, bot: &BotConfig) -> bool {
    if session_open {
        return true;
    }

    let text = text.to_lowercase();
    if text.contains(&bot.name.to_lowercase()) {
        return true;
    }
    bot.trigger_words
        .iter()
        .any(|word| !word.is_empty() && text.contains(&word.to_lowercase()))
}
