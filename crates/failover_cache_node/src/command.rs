// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// An error produced when a command name is not part of the catalog.
#[ohno::error]
#[display("unknown command: {name}")]
pub struct UnknownCommand {
    name: String,
}

/// The number of arguments a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Exact(usize),
    /// At least this many arguments.
    AtLeast(usize),
    /// Between `min` and `max` arguments, inclusive.
    Between(usize, usize),
}

impl Arity {
    /// Returns `true` if `count` arguments are acceptable.
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == n,
            Self::AtLeast(n) => count >= n,
            Self::Between(min, max) => count >= min && count <= max,
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
            Self::Between(min, max) => write!(f, "between {min} and {max}"),
        }
    }
}

/// The enumerated set of operations a store node can execute.
///
/// Names parse case-insensitively:
///
/// ```
/// use failover_cache_node::CommandName;
///
/// let name: CommandName = "HGET".parse()?;
/// assert_eq!(name, CommandName::HGet);
/// assert!(!name.is_write());
/// # Ok::<(), failover_cache_node::UnknownCommand>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    /// `PING [message]`
    Ping,
    /// `GET key`
    Get,
    /// `SET key value [options...]`
    Set,
    /// `DEL key [key...]`
    Del,
    /// `EXISTS key [key...]`
    Exists,
    /// `EXPIRE key seconds`
    Expire,
    /// `TTL key`
    Ttl,
    /// `HGET hash field`
    HGet,
    /// `HSET hash field value [field value...]`
    HSet,
    /// `HDEL hash field [field...]`
    HDel,
    /// `HEXISTS hash field`
    HExists,
    /// `HGETALL hash`
    HGetAll,
    /// `HKEYS hash`
    HKeys,
    /// `HLEN hash`
    HLen,
}

impl CommandName {
    /// Every command in the catalog.
    pub const ALL: [Self; 14] = [
        Self::Ping,
        Self::Get,
        Self::Set,
        Self::Del,
        Self::Exists,
        Self::Expire,
        Self::Ttl,
        Self::HGet,
        Self::HSet,
        Self::HDel,
        Self::HExists,
        Self::HGetAll,
        Self::HKeys,
        Self::HLen,
    ];

    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Get => "get",
            Self::Set => "set",
            Self::Del => "del",
            Self::Exists => "exists",
            Self::Expire => "expire",
            Self::Ttl => "ttl",
            Self::HGet => "hget",
            Self::HSet => "hset",
            Self::HDel => "hdel",
            Self::HExists => "hexists",
            Self::HGetAll => "hgetall",
            Self::HKeys => "hkeys",
            Self::HLen => "hlen",
        }
    }

    /// Returns `true` if the command mutates store state and must run on the primary.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Set | Self::Del | Self::Expire | Self::HSet | Self::HDel)
    }

    /// Returns the accepted argument count.
    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Ping => Arity::Between(0, 1),
            Self::Get | Self::Ttl | Self::HGetAll | Self::HKeys | Self::HLen => Arity::Exact(1),
            Self::Set => Arity::AtLeast(2),
            Self::Del | Self::Exists => Arity::AtLeast(1),
            Self::Expire | Self::HGet | Self::HExists => Arity::Exact(2),
            Self::HSet => Arity::AtLeast(3),
            Self::HDel => Arity::AtLeast(2),
        }
    }
}

impl Display for CommandName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCommand::new(s))
    }
}

/// A named operation together with its positional arguments.
///
/// # Examples
///
/// ```
/// use failover_cache_node::{Command, CommandName};
///
/// let command = Command::hset("users", "42", r#"{"name":"Ann"}"#);
/// assert_eq!(command.name(), CommandName::HSet);
/// assert_eq!(command.args().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: CommandName,
    args: Vec<String>,
}

impl Command {
    /// Creates a command from a name and its arguments.
    #[must_use]
    pub fn new(name: CommandName, args: Vec<String>) -> Self {
        Self { name, args }
    }

    /// `HGET hash field`
    pub fn hget(hash: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(CommandName::HGet, vec![hash.into(), field.into()])
    }

    /// `HSET hash field value`
    pub fn hset(hash: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(CommandName::HSet, vec![hash.into(), field.into(), value.into()])
    }

    /// Returns the command name.
    #[must_use]
    pub fn name(&self) -> CommandName {
        self.name
    }

    /// Returns the positional arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the argument at `index`, if present.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Consumes the command and returns its arguments.
    #[must_use]
    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}
