//! Event filters.
//!
//! A [`Filter`] is a pure predicate over an [`Event`], used to select which
//! events a handler sees. Filters form a closed variant set: exact-command,
//! channel-target, regex-over-field, and an AND combinator. Matching is
//! deterministic and has no side effects.
//!
//! A handler registration carries a *set* of filters with OR semantics:
//! the handler fires for every filter in the set that matches.

use regex::Regex;

use crate::event::Event;

/// Which event field a [`Filter::Regex`] searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegexField {
    /// Match against the command verb or numeric.
    Command,
    /// Match against the message prefix.
    Prefix,
    /// Match if any single parameter contains a hit.
    AnyParam,
}

/// A predicate selecting events for a handler.
#[derive(Clone, Debug)]
pub enum Filter {
    /// Exact, case-sensitive command match. The literals `"*"` and `""`
    /// are wildcards that match every event.
    Command(String),

    /// Matches events whose first parameter equals the channel name.
    /// Events with no parameters never match.
    Channel(String),

    /// Matches if the pattern finds a hit in the selected field. For
    /// [`RegexField::AnyParam`] each parameter is searched individually.
    Regex {
        /// Field to search.
        field: RegexField,
        /// Compiled pattern.
        re: Regex,
    },

    /// AND combinator: matches only if every sub-filter matches.
    /// Short-circuits on the first failure; an empty list matches
    /// trivially.
    All(Vec<Filter>),
}

impl Filter {
    /// Exact-command filter. `"*"` or `""` match everything.
    pub fn command(command: impl Into<String>) -> Self {
        Self::Command(command.into())
    }

    /// Channel-target filter.
    pub fn channel(channel: impl Into<String>) -> Self {
        Self::Channel(channel.into())
    }

    /// Regex filter over `field`.
    ///
    /// # Errors
    ///
    /// Returns the `regex` crate's error if the pattern does not compile.
    pub fn regex(field: RegexField, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex {
            field,
            re: Regex::new(pattern)?,
        })
    }

    /// AND combinator over `filters`.
    pub fn all(filters: Vec<Filter>) -> Self {
        Self::All(filters)
    }

    /// Whether this filter selects `event`.
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Self::Command(command) => {
                command == "*" || command.is_empty() || *command == event.command
            }
            Self::Channel(channel) => event.params.first().is_some_and(|p| p == channel),
            Self::Regex { field, re } => match field {
                RegexField::Command => re.is_match(&event.command),
                RegexField::Prefix => re.is_match(&event.prefix),
                RegexField::AnyParam => event.params.iter().any(|p| re.is_match(p)),
            },
            Self::All(filters) => filters.iter().all(|f| f.matches(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(command: &str, params: &[&str]) -> Event {
        Event::new(command, params.iter().map(|p| (*p).to_owned()).collect())
    }

    #[test]
    fn test_command_exact() {
        let f = Filter::command("PRIVMSG");
        assert!(f.matches(&event("PRIVMSG", &["#test", "hi"])));
        assert!(!f.matches(&event("NOTICE", &["#test", "hi"])));
    }

    #[test]
    fn test_command_is_case_sensitive() {
        assert!(!Filter::command("privmsg").matches(&event("PRIVMSG", &[])));
    }

    #[test]
    fn test_command_wildcards_match_everything() {
        for wildcard in ["*", ""] {
            let f = Filter::command(wildcard);
            assert!(f.matches(&event("PING", &["x"])));
            assert!(f.matches(&event("433", &[])));
            assert!(f.matches(&event("", &[])));
        }
    }

    #[test]
    fn test_channel_matches_first_param() {
        let f = Filter::channel("#test");
        assert!(f.matches(&event("PRIVMSG", &["#test", "hi"])));
        assert!(!f.matches(&event("PRIVMSG", &["#other", "hi"])));
        assert!(!f.matches(&event("PRIVMSG", &["hi", "#test"])));
    }

    #[test]
    fn test_channel_never_matches_without_params() {
        assert!(!Filter::channel("#test").matches(&event("QUIT", &[])));
    }

    #[test]
    fn test_regex_command() {
        let f = Filter::regex(RegexField::Command, "^4[0-9][0-9]$").unwrap();
        assert!(f.matches(&event("433", &[])));
        assert!(!f.matches(&event("PING", &[])));
    }

    #[test]
    fn test_regex_prefix() {
        let f = Filter::regex(RegexField::Prefix, "@irc\\.example\\.org$").unwrap();
        let mut ev = event("PRIVMSG", &["#test"]);
        ev.prefix = "nick!user@irc.example.org".to_owned();
        assert!(f.matches(&ev));
        ev.prefix = "nick!user@elsewhere".to_owned();
        assert!(!f.matches(&ev));
    }

    #[test]
    fn test_regex_any_param_hits_second() {
        let f = Filter::regex(RegexField::AnyParam, "bot").unwrap();
        // Misses the first parameter, hits the second.
        assert!(f.matches(&event("PRIVMSG", &["#test", "hello bot"])));
        assert!(!f.matches(&event("PRIVMSG", &["#test", "hello"])));
    }

    #[test]
    fn test_regex_params_searched_individually() {
        // The hit must land inside one parameter, not across a
        // concatenation of them.
        let f = Filter::regex(RegexField::AnyParam, "^end start$").unwrap();
        assert!(!f.matches(&event("PRIVMSG", &["the end", "start here"])));
    }

    #[test]
    fn test_all_requires_every_subfilter() {
        let f = Filter::all(vec![Filter::command("PRIVMSG"), Filter::channel("#test")]);
        assert!(f.matches(&event("PRIVMSG", &["#test", "hi"])));
        assert!(!f.matches(&event("PRIVMSG", &["#other", "hi"])));
        assert!(!f.matches(&event("NOTICE", &["#test", "hi"])));
    }

    #[test]
    fn test_all_empty_is_trivially_true() {
        assert!(Filter::all(Vec::new()).matches(&event("PING", &[])));
    }
}
