//! # Preview commands
//!
//! Clients talk to the hub with text frames of the form `name|arg`.

use crate::preview::bio::{BioBlock, BioProfile, BioSettings, Theme};
use crate::preview::{BioEdit, DeviceMode};
use displaydoc::Display;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use thiserror::Error;

/// Error when parsing a command
#[derive(Debug, Error, Display)]
pub enum ParseCommandError {
    /// The command expected an argument (e.g. `{0}|foo`)
    MissingArg(CommandKind),
    /// The argument of `{0}` is invalid: {1}
    InvalidArg(CommandKind, String),
    /// The command `{0}` is not known
    UnknownCommand(String),
}

/// A kind of incoming command
#[derive(Debug, Copy, Clone, Display, PartialEq, Eq)]
pub enum CommandKind {
    /// init
    Init,
    /// profile
    Profile,
    /// blocks
    Blocks,
    /// theme
    Theme,
    /// settings
    Settings,
    /// device
    Device,
    /// reorder
    Reorder,
    /// render
    Render,
    /// close
    Close,
}

/// An incoming command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Join the session and get the current preview
    Init,
    /// Change the draft
    Edit(BioEdit),
    /// Render some content and reply with the HTML
    Render(String),
    /// Close the connection
    Close,
}

impl FromStr for CommandKind {
    type Err = ParseCommandError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "profile" => Ok(Self::Profile),
            "blocks" => Ok(Self::Blocks),
            "theme" => Ok(Self::Theme),
            "settings" => Ok(Self::Settings),
            "device" => Ok(Self::Device),
            "reorder" => Ok(Self::Reorder),
            "render" => Ok(Self::Render),
            "close" => Ok(Self::Close),
            _ => Err(ParseCommandError::UnknownCommand(s.to_owned())),
        }
    }
}

fn split_arg(input: &str) -> (&str, Option<&str>) {
    if let Some(cmd_len) = input.find('|') {
        let (cmd, r) = input.split_at(cmd_len);
        let (_, arg) = r.split_at(1);
        (cmd, Some(arg))
    } else {
        (input, None)
    }
}

fn json_arg<T: DeserializeOwned>(kind: CommandKind, arg: Option<&str>) -> Result<T, ParseCommandError> {
    let text = arg.ok_or(ParseCommandError::MissingArg(kind))?;
    serde_json::from_str(text).map_err(|e| ParseCommandError::InvalidArg(kind, e.to_string()))
}

impl FromStr for Command {
    type Err = ParseCommandError;
    fn from_str(input: &str) -> Result<Command, ParseCommandError> {
        let (cmd, arg) = split_arg(input);

        let kind: CommandKind = cmd.parse()?;
        match kind {
            CommandKind::Init => Ok(Command::Init),
            CommandKind::Close => Ok(Command::Close),
            CommandKind::Profile => {
                let profile: BioProfile = json_arg(kind, arg)?;
                Ok(Command::Edit(BioEdit::Profile(profile)))
            }
            CommandKind::Blocks => {
                let blocks: Vec<BioBlock> = json_arg(kind, arg)?;
                Ok(Command::Edit(BioEdit::Blocks(blocks)))
            }
            CommandKind::Theme => {
                let theme: Theme = json_arg(kind, arg)?;
                Ok(Command::Edit(BioEdit::Theme(theme)))
            }
            CommandKind::Settings => {
                let settings: BioSettings = json_arg(kind, arg)?;
                Ok(Command::Edit(BioEdit::Settings(settings)))
            }
            CommandKind::Reorder => {
                let ids: Vec<String> = json_arg(kind, arg)?;
                Ok(Command::Edit(BioEdit::Reorder(ids)))
            }
            CommandKind::Device => {
                let text = arg.ok_or(ParseCommandError::MissingArg(kind))?;
                let device: DeviceMode = text
                    .parse()
                    .map_err(|e| ParseCommandError::InvalidArg(kind, format!("unknown device {:?}", e)))?;
                Ok(Command::Edit(BioEdit::Device(device)))
            }
            CommandKind::Render => {
                let text = arg.ok_or(ParseCommandError::MissingArg(kind))?;
                Ok(Command::Render(text.to_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_edits() {
        let cmd: Command = r#"profile|{"displayName": "Alice|A"}"#.parse().unwrap();
        assert_eq!(
            cmd,
            Command::Edit(BioEdit::Profile(BioProfile {
                display_name: Some(String::from("Alice|A")),
                ..BioProfile::default()
            }))
        );

        let cmd: Command = r#"reorder|["b", "a"]"#.parse().unwrap();
        assert_eq!(
            cmd,
            Command::Edit(BioEdit::Reorder(vec![String::from("b"), String::from("a")]))
        );

        let cmd: Command = "device|desktop".parse().unwrap();
        assert_eq!(cmd, Command::Edit(BioEdit::Device(DeviceMode::Desktop)));
    }

    #[test]
    fn test_parse_plain() {
        assert_eq!("init".parse::<Command>().unwrap(), Command::Init);
        assert_eq!("close".parse::<Command>().unwrap(), Command::Close);
        assert_eq!(
            "render|<p>x</p>".parse::<Command>().unwrap(),
            Command::Render(String::from("<p>x</p>"))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "shout|hi".parse::<Command>(),
            Err(ParseCommandError::UnknownCommand(c)) if c == "shout"
        ));
        assert!(matches!(
            "theme".parse::<Command>(),
            Err(ParseCommandError::MissingArg(CommandKind::Theme))
        ));
        assert!(matches!(
            "device|tablet".parse::<Command>(),
            Err(ParseCommandError::InvalidArg(CommandKind::Device, _))
        ));
        let err = "blocks|{".parse::<Command>().unwrap_err();
        assert!(err.to_string().starts_with("The argument of `blocks` is invalid"));
    }
}
