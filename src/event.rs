//! Decoded protocol events.
//!
//! An [`Event`] is one unit of protocol traffic: a single line decoded into
//! prefix, command, and parameters, stamped at decode time. Events are
//! created once and never mutated; the dispatcher shares them across
//! handlers behind an `Arc`.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::command;
use crate::error::DecodeError;

/// A single decoded IRC event.
///
/// # Example
///
/// ```
/// use slirc_client::Event;
///
/// let ev = Event::decode(":irc.example.org PRIVMSG #rust :hello world").unwrap();
/// assert_eq!(ev.prefix, "irc.example.org");
/// assert_eq!(ev.command, "PRIVMSG");
/// assert_eq!(ev.params, vec!["#rust", "hello world"]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Message source (empty if the server sent no prefix).
    pub prefix: String,
    /// Protocol verb or numeric code.
    pub command: String,
    /// Ordered command parameters. The last one may contain embedded spaces
    /// when the wire form quoted it with a leading `:`.
    pub params: Vec<String>,
    /// When the event was decoded (or synthesized).
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an outgoing event with no prefix, stamped now.
    pub fn new(command: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            prefix: String::new(),
            command: command.into(),
            params,
            timestamp: Utc::now(),
        }
    }

    /// Create a `PONG` reply carrying `params` unchanged.
    pub fn pong(params: Vec<String>) -> Self {
        Self::new(command::PONG, params)
    }

    /// Create a `NICK` command for `nick`.
    pub fn nick(nick: impl Into<String>) -> Self {
        Self::new(command::NICK, vec![nick.into()])
    }

    /// Create the RFC 2812 `USER` registration command.
    pub fn user(ident: impl Into<String>, nick: impl Into<String>) -> Self {
        Self::new(
            command::USER,
            vec![ident.into(), "0".to_owned(), "*".to_owned(), nick.into()],
        )
    }

    /// Create a `QUIT` command.
    pub fn quit() -> Self {
        Self::new(command::QUIT, Vec::new())
    }

    /// Decode one protocol line (framing already stripped) into an event.
    ///
    /// Grammar: `[:prefix ]COMMAND [param]* [:trailing with spaces]`.
    /// A leading-`:` token among the parameters absorbs the rest of the
    /// line into one trailing parameter with the sentinel stripped.
    ///
    /// Argument-count validation is a handler's concern, not the decoder's:
    /// a line with only a command decodes to an empty parameter list.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MalformedLine`] if the line is empty or carries a
    /// prefix without a command.
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        if line.is_empty() {
            return Err(DecodeError::MalformedLine);
        }

        let tokens: Vec<&str> = line.split(' ').collect();

        // The first token may be empty (whitespace-only line); strip_prefix
        // keeps the check byte-safe.
        let (prefix, command, param_start) = match tokens[0].strip_prefix(':') {
            Some(prefix) => {
                let command = tokens.get(1).ok_or(DecodeError::MalformedLine)?;
                (prefix, *command, 2)
            }
            None => ("", tokens[0], 1),
        };

        let mut params = Vec::new();
        for (i, token) in tokens[param_start..].iter().enumerate() {
            if let Some(stripped) = token.strip_prefix(':') {
                // Trailing parameter: rejoin the remaining tokens, restoring
                // the embedded spaces the initial split removed.
                let mut trailing = stripped.to_owned();
                for rest in &tokens[param_start + i + 1..] {
                    trailing.push(' ');
                    trailing.push_str(rest);
                }
                params.push(trailing);
                break;
            }
            params.push((*token).to_owned());
        }

        Ok(Self {
            prefix: prefix.to_owned(),
            command: command.to_owned(),
            params,
            timestamp: Utc::now(),
        })
    }
}

impl fmt::Display for Event {
    /// Serialize to the wire form, re-quoting the final parameter with the
    /// `:` sentinel whenever it is empty, contains a space, or begins
    /// with `:`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write!(f, ":{} ", self.prefix)?;
        }
        f.write_str(&self.command)?;
        if let Some((last, init)) = self.params.split_last() {
            for param in init {
                write!(f, " {param}")?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }
        Ok(())
    }
}
