//! Spoken command vocabulary
//!
//! The classification service answers with Italian labels; the English
//! verbs are accepted as synonyms. Matching is case-insensitive.

use crate::locomotion::LocomotionCommand;

/// A recognised word before flight-dependent resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Stop,
    Pause,
    Resume,
    Quit,
    Run,
    Walk,
    Up,
    Down,
    Fly,
    Unknown(String),
}

impl Word {
    /// Parse a label; anything outside the vocabulary becomes `Unknown`
    pub fn parse(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            "avanti" | "forward" => Word::Forward,
            "indietro" | "backward" => Word::Backward,
            "sinistra" | "left" => Word::Left,
            "destra" | "right" => Word::Right,
            "salta" | "jump" => Word::Jump,
            "fermo" | "stop" => Word::Stop,
            "pausa" | "pause" => Word::Pause,
            "continua" | "resume" => Word::Resume,
            "esci" | "quit" => Word::Quit,
            "corri" | "run" => Word::Run,
            "cammina" | "walk" => Word::Walk,
            "su" | "up" => Word::Up,
            "giu" | "giù" | "down" => Word::Down,
            "vola" | "fly" => Word::Fly,
            _ => Word::Unknown(normalized),
        }
    }

    /// Resolve into a command token given the current flight state
    ///
    /// "up" and "down" move vertically while flying and tilt the view
    /// otherwise.
    pub fn resolve(self, flying: bool) -> CommandToken {
        let command = match self {
            Word::Forward => LocomotionCommand::Forward,
            Word::Backward => LocomotionCommand::Backward,
            Word::Left => LocomotionCommand::TurnLeft,
            Word::Right => LocomotionCommand::TurnRight,
            Word::Jump => LocomotionCommand::Jump,
            Word::Stop => LocomotionCommand::Stop,
            Word::Run => LocomotionCommand::Run,
            Word::Walk => LocomotionCommand::Walk,
            Word::Fly => LocomotionCommand::Fly,
            Word::Up if flying => LocomotionCommand::VerticalUp,
            Word::Up => LocomotionCommand::LookUp,
            Word::Down if flying => LocomotionCommand::VerticalDown,
            Word::Down => LocomotionCommand::LookDown,
            Word::Pause => return CommandToken::Pause,
            Word::Resume => return CommandToken::Resume,
            Word::Quit => return CommandToken::Quit,
            Word::Unknown(label) => return CommandToken::Unknown(label),
        };
        CommandToken::Move(command)
    }
}

/// A fully resolved command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandToken {
    Move(LocomotionCommand),
    Pause,
    Resume,
    Quit,
    Unknown(String),
}

impl CommandToken {
    /// Whether the token passes the pause filter
    pub fn allowed_while_paused(&self) -> bool {
        matches!(self, CommandToken::Resume | CommandToken::Quit)
    }
}

impl std::fmt::Display for CommandToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandToken::Move(command) => write!(f, "{}", command),
            CommandToken::Pause => write!(f, "pause"),
            CommandToken::Resume => write!(f, "resume"),
            CommandToken::Quit => write!(f, "quit"),
            CommandToken::Unknown(label) => write!(f, "unknown({})", label),
        }
    }
}
