//! Command definitions and their fixed-width wire encoding.
//!
//! Every command is a 4-character mnemonic followed by a parameter
//! left-aligned in a 4-character field and a carriage return:
//!
//! ```text
//!  P O W R 1 _ _ _ \r
//!  └mnemonic┘└param┘
//! ```
//!
//! Query forms put `?` in the parameter field. Raw button codes are the
//! only exception and are written verbatim.

use std::fmt;
use std::str::FromStr;

use crate::error::AquosError;

/// Line terminator for every outbound command.
pub const TERMINATOR: char = '\r';

/// Width of the parameter field following the mnemonic.
pub const PARAM_WIDTH: usize = 4;

/// Remote-key code of the Netflix shortcut button.
pub const NETFLIX_KEY: u16 = 59;

/// Valid input selectors.
pub const INPUT_RANGE: (i64, i64) = (1, 9);

/// Valid volume levels.
pub const VOLUME_RANGE: (i64, i64) = (0, 60);

/// Captioning levels fit the 2-digit parameter.
pub const CAPTIONING_RANGE: (i64, i64) = (0, 99);

/// Channel and remote-key codes fit the 4-character parameter.
pub const CODE_RANGE: (i64, i64) = (0, 9999);

// ── Command ──────────────────────────────────────────────────────

/// All commands understood by the AQUOS IP-control protocol.
///
/// `None` parameters mean "query the current value".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Handshake command; its `OK` flips the connection to ready.
    Setup,
    /// Power on/off.
    Power(Option<bool>),
    /// Mute on/off. The device encodes unmute as `2`.
    Mute(Option<bool>),
    /// Volume level 0–60.
    Volume(Option<u8>),
    /// Input selector 1–9.
    Input(Option<u8>),
    /// Channel code, space-padded to four characters.
    Channel(Option<u16>),
    /// Closed-caption mode.
    Captioning(Option<u8>),
    /// Next channel.
    ChannelUp,
    /// Previous channel.
    ChannelDown,
    /// Press a remote-control key by code.
    RemoteKey(u16),
    /// Raw code written as-is, followed by the terminator.
    Button(String),
}

impl Command {
    // ── Validated constructors ───────────────────────────────────

    pub fn power(on: Option<bool>) -> Self {
        Self::Power(on)
    }

    pub fn mute(muted: Option<bool>) -> Self {
        Self::Mute(muted)
    }

    pub fn volume(level: Option<i64>) -> Result<Self, AquosError> {
        let level = level
            .map(|v| checked("volume level", v, VOLUME_RANGE))
            .transpose()?;
        Ok(Self::Volume(level.map(|v| v as u8)))
    }

    pub fn input(input: Option<i64>) -> Result<Self, AquosError> {
        let input = input
            .map(|v| checked("input", v, INPUT_RANGE))
            .transpose()?;
        Ok(Self::Input(input.map(|v| v as u8)))
    }

    pub fn channel(code: Option<i64>) -> Result<Self, AquosError> {
        let code = code
            .map(|v| checked("channel code", v, CODE_RANGE))
            .transpose()?;
        Ok(Self::Channel(code.map(|v| v as u16)))
    }

    pub fn captioning(level: Option<i64>) -> Result<Self, AquosError> {
        let level = level
            .map(|v| checked("captioning level", v, CAPTIONING_RANGE))
            .transpose()?;
        Ok(Self::Captioning(level.map(|v| v as u8)))
    }

    pub fn remote_key(code: i64) -> Result<Self, AquosError> {
        let code = checked("remote key", code, CODE_RANGE)?;
        Ok(Self::RemoteKey(code as u16))
    }

    pub fn netflix() -> Self {
        Self::RemoteKey(NETFLIX_KEY)
    }

    /// A raw button code. Line breaks are rejected because each one
    /// would make the device send an extra reply.
    pub fn button(code: impl Into<String>) -> Result<Self, AquosError> {
        let cmd = Self::Button(code.into());
        cmd.validate()?;
        Ok(cmd)
    }

    // ── Validation ───────────────────────────────────────────────

    /// Re-check parameters of a command built directly from its variant.
    pub fn validate(&self) -> Result<(), AquosError> {
        match self {
            Self::Volume(Some(v)) => checked("volume level", *v as i64, VOLUME_RANGE).map(drop),
            Self::Input(Some(v)) => checked("input", *v as i64, INPUT_RANGE).map(drop),
            Self::Channel(Some(v)) => checked("channel code", *v as i64, CODE_RANGE).map(drop),
            Self::Captioning(Some(v)) => {
                checked("captioning level", *v as i64, CAPTIONING_RANGE).map(drop)
            }
            Self::RemoteKey(v) => checked("remote key", *v as i64, CODE_RANGE).map(drop),
            Self::Button(code) => {
                if code.is_empty() {
                    Err(AquosError::InvalidCommand("empty button code".into()))
                } else if code.contains(['\r', '\n']) {
                    Err(AquosError::InvalidCommand(format!(
                        "button code {code:?} contains a line break"
                    )))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    // ── Encoding ─────────────────────────────────────────────────

    /// The 4-character mnemonic, or `None` for raw button codes.
    pub fn mnemonic(&self) -> Option<&'static str> {
        match self {
            Self::Setup => Some("RSPW"),
            Self::Power(_) => Some("POWR"),
            Self::Mute(_) => Some("MUTE"),
            Self::Volume(_) => Some("VOLM"),
            Self::Input(_) => Some("IAVD"),
            Self::Channel(_) => Some("CTBD"),
            Self::Captioning(_) => Some("CLCP"),
            Self::ChannelUp => Some("CHUP"),
            Self::ChannelDown => Some("CHDW"),
            Self::RemoteKey(_) => Some("RCKY"),
            Self::Button(_) => None,
        }
    }

    fn param(&self) -> Option<String> {
        match self {
            Self::Setup => Some("2".into()),
            Self::Power(v) => v.map(|on| if on { "1" } else { "0" }.to_string()),
            Self::Mute(v) => v.map(|on| if on { "1" } else { "2" }.to_string()),
            Self::Volume(v) | Self::Captioning(v) => v.map(|n| format!("{n:02}")),
            Self::Input(v) => v.map(|n| n.to_string()),
            Self::Channel(v) => v.map(|n| n.to_string()),
            Self::ChannelUp | Self::ChannelDown => Some("0".into()),
            Self::RemoteKey(code) => Some(code.to_string()),
            Self::Button(_) => None,
        }
    }

    /// Render the exact bytes written to the socket.
    pub fn encode(&self) -> String {
        match self {
            Self::Button(code) => format!("{code}{TERMINATOR}"),
            _ => {
                let mnemonic = self.mnemonic().unwrap_or_default();
                let param = self.param().unwrap_or_else(|| "?".into());
                format!("{mnemonic}{param:<width$}{TERMINATOR}", width = PARAM_WIDTH)
            }
        }
    }
}

fn checked(field: &'static str, value: i64, (min, max): (i64, i64)) -> Result<i64, AquosError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(AquosError::range(field, value, min, max))
    }
}

// ── Text syntax ──────────────────────────────────────────────────

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn on_off(v: &Option<bool>) -> &'static str {
            match v {
                None => "?",
                Some(true) => "on",
                Some(false) => "off",
            }
        }
        fn num<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "?".into(), |n| n.to_string())
        }

        match self {
            Self::Setup => write!(f, "setup"),
            Self::Power(v) => write!(f, "power {}", on_off(v)),
            Self::Mute(v) => write!(f, "mute {}", on_off(v)),
            Self::Volume(v) => write!(f, "volume {}", num(v)),
            Self::Input(v) => write!(f, "input {}", num(v)),
            Self::Channel(v) => write!(f, "channel {}", num(v)),
            Self::Captioning(v) => write!(f, "captioning {}", num(v)),
            Self::ChannelUp => write!(f, "channel-up"),
            Self::ChannelDown => write!(f, "channel-down"),
            Self::RemoteKey(NETFLIX_KEY) => write!(f, "netflix"),
            Self::RemoteKey(code) => write!(f, "key {code}"),
            Self::Button(code) => write!(f, "button {code}"),
        }
    }
}

impl FromStr for Command {
    type Err = AquosError;

    /// Parse the `verb [argument]` syntax used by the CLI shell.
    /// A missing argument or `?` means query.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| AquosError::InvalidCommand("empty command".into()))?
            .to_ascii_lowercase();
        let arg = words.next().filter(|a| *a != "?");
        if words.next().is_some() {
            return Err(AquosError::InvalidCommand(format!("too many arguments: {s}")));
        }

        match verb.as_str() {
            "power" => Ok(Self::power(arg.map(parse_switch).transpose()?)),
            "mute" => Ok(Self::mute(arg.map(parse_switch).transpose()?)),
            "volume" | "vol" => Self::volume(arg.map(parse_number).transpose()?),
            "input" => Self::input(arg.map(parse_number).transpose()?),
            "channel" | "ch" => Self::channel(arg.map(parse_number).transpose()?),
            "captioning" | "cc" => Self::captioning(arg.map(parse_number).transpose()?),
            "channel-up" | "up" => Ok(Self::ChannelUp),
            "channel-down" | "down" => Ok(Self::ChannelDown),
            "netflix" => Ok(Self::netflix()),
            "key" => {
                let code = arg.ok_or_else(|| AquosError::InvalidCommand("key needs a code".into()))?;
                Self::remote_key(parse_number(code)?)
            }
            "button" => {
                let code =
                    arg.ok_or_else(|| AquosError::InvalidCommand("button needs a code".into()))?;
                Self::button(code)
            }
            other => Err(AquosError::InvalidCommand(format!("unknown command: {other}"))),
        }
    }
}

fn parse_switch(s: &str) -> Result<bool, AquosError> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(AquosError::InvalidCommand(format!("expected on/off, got {s}"))),
    }
}

fn parse_number(s: &str) -> Result<i64, AquosError> {
    s.parse()
        .map_err(|_| AquosError::InvalidCommand(format!("expected a number, got {s}")))
}

// ── Tests ────────────────────────────────────────────────────────
