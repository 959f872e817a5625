use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Filter over which entry categories the picker offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    All,
    Sessions,
    Directories,
}

/// Cycle order for next/previous. Closed set; wraps at both ends.
pub const MODES: [Mode; 3] = [Mode::All, Mode::Sessions, Mode::Directories];

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::All => "all",
            Mode::Sessions => "sessions",
            Mode::Directories => "directories",
        }
    }

    fn position(self) -> usize {
        MODES.iter().position(|m| *m == self).unwrap_or(0)
    }

    pub fn next(self) -> Mode {
        MODES[(self.position() + 1) % MODES.len()]
    }

    pub fn previous(self) -> Mode {
        MODES[(self.position() + MODES.len() - 1) % MODES.len()]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Mode::All),
            "sessions" => Ok(Mode::Sessions),
            "directories" => Ok(Mode::Directories),
            other => Err(anyhow::anyhow!("unknown mode: {}", other)),
        }
    }
}

/// Current mode for one running launcher instance.
///
/// The lock guards only the value transition; callers never hold it across
/// I/O. State is in-memory only and resets to `All` on restart.
#[derive(Debug)]
pub struct ModeState {
    current: Mutex<Mode>,
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new(Mode::All)
    }
}

impl ModeState {
    pub fn new(initial: Mode) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    pub fn get(&self) -> Mode {
        *self.current.lock().expect("mode lock poisoned")
    }

    pub fn set(&self, mode: Mode) {
        *self.current.lock().expect("mode lock poisoned") = mode;
    }

    /// Advance one step in the cycle and return the new value.
    pub fn next(&self) -> Mode {
        let mut current = self.current.lock().expect("mode lock poisoned");
        *current = current.next();
        *current
    }

    /// Retreat one step in the cycle and return the new value.
    pub fn previous(&self) -> Mode {
        let mut current = self.current.lock().expect("mode lock poisoned");
        *current = current.previous();
        *current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn next_cycles_through_all_modes() {
        let state = ModeState::default();
        assert_eq!(state.get(), Mode::All);
        assert_eq!(state.next(), Mode::Sessions);
        assert_eq!(state.next(), Mode::Directories);
        assert_eq!(state.next(), Mode::All);
    }

    #[test]
    fn previous_wraps_backwards() {
        let state = ModeState::default();
        assert_eq!(state.previous(), Mode::Directories);
        assert_eq!(state.previous(), Mode::Sessions);
        assert_eq!(state.previous(), Mode::All);
    }

    #[test]
    fn next_then_previous_round_trips() {
        for initial in MODES {
            let state = ModeState::new(initial);
            state.next();
            assert_eq!(state.previous(), initial);
            state.previous();
            assert_eq!(state.next(), initial);
        }
    }

    #[test]
    fn get_reflects_last_set() {
        let state = ModeState::default();
        state.set(Mode::Directories);
        assert_eq!(state.get(), Mode::Directories);
    }

    #[test]
    fn concurrent_steps_commit_exactly_once_each() {
        let state = Arc::new(ModeState::default());
        let mut handles = Vec::new();
        for _ in 0..30 {
            let state = Arc::clone(&state);
            handles.push(std::thread::spawn(move || {
                let m = state.next();
                assert!(MODES.contains(&m));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // 30 steps over a cycle of 3 land back on the initial value.
        assert_eq!(state.get(), Mode::All);
    }

    #[test]
    fn mode_parses_from_str() {
        assert_eq!("sessions".parse::<Mode>().unwrap(), Mode::Sessions);
        assert!("bogus".parse::<Mode>().is_err());
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::All).unwrap(), "\"all\"");
    }
}
