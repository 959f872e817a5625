use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// One selectable directory from the configured root set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub full_path: PathBuf,
    /// Home-relative display path, e.g. `~/Work/api`.
    pub truncated_home_path: String,
    pub label: String,
}

/// Enumerate all configured directories plus depth-limited subdirectories.
/// Unreadable roots are skipped; duplicates are removed by full path.
pub fn directories(config: &Config) -> Vec<Directory> {
    let mut all = Vec::new();

    for dir in &config.directories {
        let expanded = PathBuf::from(expand_env(&dir.path));
        let label = base_name(&expanded);

        all.push(Directory {
            truncated_home_path: truncate_home_path(&expanded),
            label,
            full_path: expanded.clone(),
        });

        if dir.depth > 0 {
            collect_subdirectories(&expanded, dir.depth, &mut all);
        }
    }

    deduplicate(all)
}

fn collect_subdirectories(base: &Path, depth: u32, out: &mut Vec<Directory>) {
    let entries = match std::fs::read_dir(base) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut names: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();

    for name in names {
        let full_path = base.join(&name);
        out.push(Directory {
            truncated_home_path: truncate_home_path(&full_path),
            label: name,
            full_path: full_path.clone(),
        });

        if depth > 1 {
            collect_subdirectories(&full_path, depth - 1, out);
        }
    }
}

fn deduplicate(dirs: Vec<Directory>) -> Vec<Directory> {
    let mut seen = HashSet::new();
    dirs.into_iter()
        .filter(|d| seen.insert(d.full_path.clone()))
        .collect()
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Replace a leading `$HOME`, `~/`, or bare `~` with the home directory.
/// `~user` paths are left untouched.
fn expand_env(path: &str) -> String {
    let Some(home) = dirs::home_dir() else {
        return path.to_string();
    };

    if let Some(rest) = path.strip_prefix("$HOME") {
        return format!("{}{}", home.display(), rest);
    }
    if path == "~" {
        return home.display().to_string();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return format!("{}/{}", home.display(), rest);
    }
    path.to_string()
}

/// Replace the home directory prefix with `~` for display.
pub fn truncate_home_path(path: &Path) -> String {
    let display = path.to_string_lossy();
    if let Some(home) = dirs::home_dir() {
        let home = home.to_string_lossy();
        if let Some(rest) = display.strip_prefix(home.as_ref()) {
            return format!("~{}", rest);
        }
    }
    display.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryConfig;
    use tempfile::TempDir;

    fn config_for(path: &str, depth: u32) -> Config {
        Config {
            directories: vec![DirectoryConfig {
                path: path.to_string(),
                depth,
            }],
            socket: None,
            picker_port: None,
        }
    }

    #[test]
    fn lists_configured_root() {
        let dir = TempDir::new().unwrap();
        let dirs = directories(&config_for(dir.path().to_str().unwrap(), 0));
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].full_path, dir.path());
    }

    #[test]
    fn walks_subdirectories_to_depth() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/inner")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();

        let shallow = directories(&config_for(dir.path().to_str().unwrap(), 1));
        let labels: Vec<_> = shallow.iter().map(|d| d.label.as_str()).collect();
        assert!(labels.contains(&"a"));
        assert!(labels.contains(&"b"));
        assert!(!labels.contains(&"inner"));

        let deep = directories(&config_for(dir.path().to_str().unwrap(), 2));
        assert!(deep.iter().any(|d| d.label == "inner"));
    }

    #[test]
    fn skips_hidden_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();

        let dirs = directories(&config_for(dir.path().to_str().unwrap(), 1));
        assert!(!dirs.iter().any(|d| d.label == ".git"));
        assert!(dirs.iter().any(|d| d.label == "src"));
    }

    #[test]
    fn deduplicates_overlapping_roots() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap().to_string();
        let config = Config {
            directories: vec![
                DirectoryConfig {
                    path: path.clone(),
                    depth: 0,
                },
                DirectoryConfig { path, depth: 0 },
            ],
            socket: None,
            picker_port: None,
        };
        assert_eq!(directories(&config).len(), 1);
    }

    #[test]
    fn unreadable_root_yields_root_only() {
        let dirs = directories(&config_for("/nonexistent/muxpick-test", 2));
        assert_eq!(dirs.len(), 1);
    }

    #[test]
    fn expands_home_prefixes() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let home = home.display().to_string();
        assert_eq!(expand_env("$HOME/work"), format!("{}/work", home));
        assert_eq!(expand_env("~/work"), format!("{}/work", home));
        assert_eq!(expand_env("~"), home);
    }

    #[test]
    fn tilde_user_paths_are_not_expanded() {
        assert_eq!(expand_env("~alice/work"), "~alice/work");
        assert_eq!(expand_env("/tmp/plain"), "/tmp/plain");
    }

    #[test]
    fn truncates_home_prefix() {
        if let Some(home) = dirs::home_dir() {
            let path = home.join("projects/api");
            assert_eq!(truncate_home_path(&path), "~/projects/api");
        }
        assert_eq!(truncate_home_path(Path::new("/tmp/x")), "/tmp/x");
    }
}
