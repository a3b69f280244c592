//! STOMP command types.

use std::fmt;
use std::str::FromStr;

/// A STOMP frame command.
///
/// Only the commands this broker speaks are modelled. Anything else is
/// reported by the parser as a rejected frame rather than a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Server handshake reply.
    Connected,
    /// Register interest in a destination.
    Subscribe,
    /// Drop a subscription by id.
    Unsubscribe,
    /// Publish a message to a destination.
    Send,
    /// Server-to-client delivery of a published message.
    Message,
    /// Acknowledgement of a receipt-bearing client frame.
    Receipt,
    /// Graceful client shutdown.
    Disconnect,
    /// Server-reported protocol or processing failure.
    Error,
}

impl Command {
    /// All commands, in wire-name order of the STOMP 1.2 spec.
    pub const ALL: [Command; 9] = [
        Command::Connect,
        Command::Connected,
        Command::Subscribe,
        Command::Unsubscribe,
        Command::Send,
        Command::Message,
        Command::Receipt,
        Command::Disconnect,
        Command::Error,
    ];

    /// The wire name of this command.
    pub const fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Disconnect => "DISCONNECT",
            Command::Error => "ERROR",
        }
    }

    /// Whether frames with this command may carry a body.
    pub const fn allows_body(self) -> bool {
        matches!(self, Command::Send | Command::Message | Command::Error)
    }

    /// Whether this command is only ever sent by a server.
    pub const fn is_server_command(self) -> bool {
        matches!(
            self,
            Command::Connected | Command::Message | Command::Receipt | Command::Error
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`Command::from_str`] for names outside the modelled set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Command names are case-sensitive on the wire.
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for cmd in Command::ALL {
            assert_eq!(cmd.as_str().parse::<Command>(), Ok(cmd));
        }
    }

    #[test]
    fn lowercase_is_unknown() {
        assert_eq!(
            "send".parse::<Command>(),
            Err(UnknownCommand("send".to_string()))
        );
    }

    #[test]
    fn body_rules() {
        assert!(Command::Send.allows_body());
        assert!(Command::Message.allows_body());
        assert!(Command::Error.allows_body());
        assert!(!Command::Subscribe.allows_body());
        assert!(!Command::Disconnect.allows_body());
    }

    #[test]
    fn server_commands() {
        assert!(Command::Receipt.is_server_command());
        assert!(!Command::Send.is_server_command());
    }
}
