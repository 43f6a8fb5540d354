//! Admin command grammar: `/verb [argument]`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Help,
    Stats,
    Key(String),
    Issue(String),
    Rotate(String),
    History(String),
    Delete(String),
    DeleteAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Commands start with '/'. Send /help for the list.")]
    NotACommand,

    #[error("Unknown command /{0}. Send /help for the list.")]
    Unknown(String),

    #[error("Usage: /{0} <accountId>")]
    MissingArgument(&'static str),
}

impl AdminCommand {
    /// Parse a text message. A `@botname` suffix on the verb is ignored.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut parts = text.split_whitespace();
        let head = parts.next().ok_or(ParseError::NotACommand)?;
        let verb = head.strip_prefix('/').ok_or(ParseError::NotACommand)?;
        let verb = verb.split('@').next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next().map(str::to_string);

        let need = |name: &'static str| arg.clone().ok_or(ParseError::MissingArgument(name));

        match verb.as_str() {
            "help" | "start" => Ok(AdminCommand::Help),
            "stats" => Ok(AdminCommand::Stats),
            "key" => need("key").map(AdminCommand::Key),
            "issue" => need("issue").map(AdminCommand::Issue),
            "rotate" => need("rotate").map(AdminCommand::Rotate),
            "history" => need("history").map(AdminCommand::History),
            "delete" => need("delete").map(AdminCommand::Delete),
            "deleteall" => Ok(AdminCommand::DeleteAll),
            "" => Err(ParseError::NotACommand),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }

    /// Whether the command needs an admin identity.
    pub fn is_privileged(&self) -> bool {
        !matches!(self, AdminCommand::Help)
    }
}

pub const HELP_TEXT: &str = "\
Available commands:
/stats - request and visitor totals
/key <accountId> - show the live API key
/issue <accountId> - issue a key if the account has none
/rotate <accountId> - replace the account's key
/history <accountId> - list every key issued to the account
/delete <accountId> - remove the account's keys
/deleteall - remove every API key";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(AdminCommand::parse("/stats"), Ok(AdminCommand::Stats));
        assert_eq!(AdminCommand::parse("/start"), Ok(AdminCommand::Help));
        assert_eq!(
            AdminCommand::parse("  /Rotate@gateway_bot   alice extra"),
            Ok(AdminCommand::Rotate("alice".into()))
        );
        assert_eq!(AdminCommand::parse("/deleteall"), Ok(AdminCommand::DeleteAll));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(AdminCommand::parse(""), Err(ParseError::NotACommand));
        assert_eq!(AdminCommand::parse("stats"), Err(ParseError::NotACommand));
        assert_eq!(
            AdminCommand::parse("/issue"),
            Err(ParseError::MissingArgument("issue"))
        );
        assert_eq!(
            AdminCommand::parse("/shutdown"),
            Err(ParseError::Unknown("shutdown".into()))
        );
    }

    #[test]
    fn test_only_help_is_public() {
        assert!(!AdminCommand::Help.is_privileged());
        assert!(AdminCommand::Stats.is_privileged());
        assert!(AdminCommand::DeleteAll.is_privileged());
    }
}
