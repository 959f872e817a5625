use std::fmt;
use std::str::FromStr;

use unicode_width::UnicodeWidthStr;

use crate::mode::{MODES, Mode};
use crate::tmux::Session;
use crate::workspace::Directory;

/// Field separator inside picker lines and accept payloads.
pub const SEPARATOR: &str = "|";

/// Keys bound in the picker to cycle the mode.
pub const KEY_MODE_NEXT: &str = "ctrl-f";
pub const KEY_MODE_PREV: &str = "ctrl-b";

const RESET: &str = "\x1b[0m";
const STYLE_SESSION: &str = "\x1b[3;96m";
const STYLE_DIRECTORY: &str = "\x1b[3;94m";
const STYLE_CURRENT: &str = "\x1b[1;92m";
const STYLE_PATH: &str = "\x1b[3;90m";
const STYLE_MUTE: &str = "\x1b[30m";
const STYLE_FAINT: &str = "\x1b[2m";
const STYLE_FAINT_EM: &str = "\x1b[2;1;3m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Session,
    Directory,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Session => "session",
            Category::Directory => "directory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(Category::Session),
            "directory" => Ok(Category::Directory),
            other => Err(anyhow::anyhow!("unknown category: {}", other)),
        }
    }
}

/// One selectable picker row. Ephemeral; rebuilt on every content build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub category: Category,
    pub label: String,
    pub display_path: String,
    pub search_key: String,
    /// What fzf emits on accept: `category|identifier`.
    pub accept_payload: String,
    pub is_current: bool,
}

impl Entry {
    fn from_session(session: &Session) -> Self {
        Self {
            category: Category::Session,
            label: session.name.clone(),
            display_path: session.path.clone(),
            search_key: session.name.clone(),
            accept_payload: format!("{}{}{}", Category::Session, SEPARATOR, session.id),
            is_current: session.is_current,
        }
    }

    fn from_directory(dir: &Directory) -> Self {
        Self {
            category: Category::Directory,
            label: dir.label.clone(),
            display_path: dir.truncated_home_path.clone(),
            search_key: dir.truncated_home_path.clone(),
            accept_payload: format!(
                "{}{}{}",
                Category::Directory,
                SEPARATOR,
                dir.full_path.display()
            ),
            is_current: false,
        }
    }
}

/// Assemble the entry list for a mode. Pure: same inputs, same output.
/// Sessions come before directories under `All`.
pub fn entries(mode: Mode, sessions: &[Session], dirs: &[Directory]) -> Vec<Entry> {
    let mut result = Vec::new();

    if matches!(mode, Mode::All | Mode::Sessions) {
        result.extend(sessions.iter().map(Entry::from_session));
    }
    if matches!(mode, Mode::All | Mode::Directories) {
        result.extend(dirs.iter().map(Entry::from_directory));
    }

    result
}

/// Render entries as aligned picker lines.
///
/// Each line carries four `|`-separated fields: the aligned visible columns
/// (category, name, path), a muted search key, then the accept payload's
/// category and identifier. The picker shows fields 1-2 (the search key is
/// painted mute), searches field 2, and emits fields 3-4 on accept.
pub fn render(entries: &[Entry]) -> String {
    let rows: Vec<[String; 3]> = entries
        .iter()
        .map(|entry| {
            let category = match entry.category {
                Category::Session => format!("{}{}{}", STYLE_SESSION, entry.category, RESET),
                Category::Directory => format!("{}{}{}", STYLE_DIRECTORY, entry.category, RESET),
            };
            let name = if entry.is_current {
                format!("[{}{}{}]", STYLE_CURRENT, entry.label, RESET)
            } else {
                entry.label.clone()
            };
            let path = format!("{}{}{}", STYLE_PATH, entry.display_path, RESET);
            [category, name, path]
        })
        .collect();

    let mut widths = [0usize; 3];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    for (row, entry) in rows.iter().zip(entries) {
        for (cell, width) in row.iter().zip(widths) {
            output.push_str(cell);
            output.push_str(&" ".repeat(width - display_width(cell) + 2));
        }
        output.push_str(&format!(
            "{}{}{}{}{}{}{}",
            STYLE_MUTE, SEPARATOR, entry.search_key, SEPARATOR, entry.accept_payload, RESET, "\n"
        ));
    }

    output
}

/// Assemble and render in one step, as the server handlers consume it.
pub fn build_content(mode: Mode, sessions: &[Session], dirs: &[Directory]) -> String {
    render(&entries(mode, sessions, dirs))
}

/// Header: key hint line plus the mode ribbon with the active mode bracketed.
pub fn build_header(mode: Mode) -> String {
    let mut header = format!(
        "{}Press {}/{} to switch mode{}\n",
        STYLE_FAINT, KEY_MODE_NEXT, KEY_MODE_PREV, RESET
    );

    let ribbon: Vec<String> = MODES
        .iter()
        .map(|m| {
            if *m == mode {
                format!("[{}{}{}]", STYLE_CURRENT, m, RESET)
            } else {
                format!("{}{}{}", STYLE_FAINT_EM, m, RESET)
            }
        })
        .collect();
    header.push_str(&ribbon.join(" "));

    header
}

/// Split an accept payload back into category and identifier.
/// Both halves are trimmed; an unknown category is an error.
pub fn parse_selection(selection: &str) -> anyhow::Result<(Category, String)> {
    let mut parts = selection.trim().splitn(2, SEPARATOR);
    let (Some(category), Some(identifier)) = (parts.next(), parts.next()) else {
        anyhow::bail!("invalid selection format: {}", selection);
    };

    let category = category.trim().parse::<Category>()?;
    let identifier = identifier.trim().to_string();
    if identifier.is_empty() {
        anyhow::bail!("empty identifier in selection: {}", selection);
    }

    Ok((category, identifier))
}

fn display_width(s: &str) -> usize {
    let stripped = strip_ansi_escapes::strip(s);
    String::from_utf8_lossy(&stripped).width()
}
