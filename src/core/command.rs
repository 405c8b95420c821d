//! Composer commands.
//!
//! A composer line starting with `/` is a command rather than a message.
//! Anything else, including a bare `/`, is sent as text.

use std::path::PathBuf;

use crate::core::error::ClientError;

pub const HELP: &str = "/attach <file>  /detach  /record  /pause  /resume  /stop  \
/send-voice  /clear-voice  /block  /unblock  /avatar <image>  /back  /logout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Attach(PathBuf),
    Detach,
    Record,
    Pause,
    Resume,
    Stop,
    SendVoice,
    ClearVoice,
    Block,
    Unblock,
    Avatar(PathBuf),
    Back,
    Logout,
    Help,
}

/// Whether a composer line should be parsed as a command.
pub fn is_command(line: &str) -> bool {
    let line = line.trim_start();
    line.len() > 1 && line.starts_with('/') && !line.starts_with("//")
}

pub fn parse(line: &str) -> Result<Command, ClientError> {
    let line = line.trim();
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name {
        "/attach" => Command::Attach(path_arg("/attach", arg)?),
        "/detach" => Command::Detach,
        "/record" => Command::Record,
        "/pause" => Command::Pause,
        "/resume" => Command::Resume,
        "/stop" => Command::Stop,
        "/send-voice" => Command::SendVoice,
        "/clear-voice" => Command::ClearVoice,
        "/block" => Command::Block,
        "/unblock" => Command::Unblock,
        "/avatar" => Command::Avatar(path_arg("/avatar", arg)?),
        "/back" => Command::Back,
        "/logout" => Command::Logout,
        "/help" => Command::Help,
        other => {
            return Err(ClientError::skipped(format!(
                "Unknown command {other}. Try /help"
            )));
        }
    };
    Ok(command)
}

/// A path argument; a leading `~/` is expanded to the home directory.
fn path_arg(command: &str, arg: &str) -> Result<PathBuf, ClientError> {
    let arg = arg.trim_matches(|c| c == '"' || c == '\'');
    if arg.is_empty() {
        return Err(ClientError::skipped(format!("Usage: {command} <path>")));
    }
    if let Some(rest) = arg.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("/record"), Ok(Command::Record));
        assert_eq!(parse("  /send-voice "), Ok(Command::SendVoice));
        assert_eq!(parse("/block"), Ok(Command::Block));
    }

    #[test]
    fn test_parse_path_argument() {
        assert_eq!(
            parse("/attach \"/tmp/cat photo.png\""),
            Ok(Command::Attach(PathBuf::from("/tmp/cat photo.png")))
        );
        assert!(matches!(parse("/avatar"), Err(ClientError::ValidationSkipped(_))));
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("/shrug").unwrap_err();
        assert_eq!(err.to_string(), "Unknown command /shrug. Try /help");
    }

    #[test]
    fn test_is_command() {
        assert!(is_command("/stop"));
        assert!(!is_command("/"));
        assert!(!is_command("//not a command"));
        assert!(!is_command("hello /stop"));
    }
}
