//! Push-to-talk input lines and key state tracking
//!
//! The listener reads one instruction per line:
//! - `v` / `press`: talk key pressed
//! - `^v` / `release`: talk key released
//! - `say <label>`: inject a command label without recording

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Press,
    Release,
    Say(String),
}

impl InputLine {
    /// Parse a line; blank or unknown lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(label) = line.strip_prefix("say ") {
            let label = label.trim();
            return (!label.is_empty()).then(|| InputLine::Say(label.to_string()));
        }
        match line.to_lowercase().as_str() {
            "v" | "press" => Some(InputLine::Press),
            "^v" | "release" => Some(InputLine::Release),
            _ => None,
        }
    }
}

/// Tracks whether the talk key is held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TalkKeyState {
    pub held: bool,
}

impl TalkKeyState {
    /// Apply a press or release, returning true on an edge
    pub fn update(&mut self, held: bool) -> bool {
        let changed = self.held != held;
        self.held = held;
        changed
    }
}
