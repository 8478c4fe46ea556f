// src/resolver/mod.rs
//
// Best-effort location of an application's executable from registry-derived
// hints. Strategies are tried in a fixed priority order and the first one
// that produces an existing file wins; exhausting them is "path unknown",
// not an error.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// Registry-derived hints for one installed application.
#[derive(Debug, Clone, Default)]
pub struct ResolutionHints {
    pub app_name: String,
    pub display_icon: Option<String>,
    pub uninstall_string: Option<String>,
    pub install_location: Option<String>,
}

pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, hints: &ResolutionHints) -> Option<PathBuf>;
}

pub struct ExecutableResolver {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutableResolver {
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(IconPath),
                Box::new(UninstallerPath),
                Box::new(UninstallerCommand),
                Box::new(InstallDirScan),
                Box::new(PathLookup),
            ],
        }
    }

    pub fn resolve(&self, hints: &ResolutionHints) -> Option<PathBuf> {
        for strategy in &self.strategies {
            if let Some(path) = strategy.resolve(hints) {
                tracing::debug!(
                    strategy = strategy.name(),
                    app = %hints.app_name,
                    path = %path.display(),
                    "resolved executable"
                );
                return Some(path);
            }
        }
        None
    }
}

/// Display names mapped to the executable file names they are known to ship.
static KNOWN_EXECUTABLES: &[(&str, &[&str])] = &[
    ("google chrome", &["chrome.exe"]),
    ("github desktop", &["githubdesktop.exe"]),
    ("git", &["git.exe"]),
    ("dropbox", &["dropbox.exe"]),
    ("dbeaver", &["dbeaver.exe"]),
    ("epic games launcher", &["epicgameslauncher.exe"]),
    ("aws command line interface", &["aws.exe"]),
    ("go programming language", &["go.exe"]),
    ("fast node manager", &["fnm.exe"]),
];

static ICON_INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\d+\s*$").unwrap());
static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"%([^%]+)%").unwrap());
static QUOTED_EXE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)"([^"]+?\.exe)""#).unwrap());
static BARE_EXE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([A-Za-z]:\\[^ ]+?\.exe)").unwrap());

/// Expand Windows-style `%VAR%` references; unknown variables are left as-is.
pub(crate) fn expand_env_vars(value: &str) -> String {
    ENV_VAR_RE
        .replace_all(value, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Normalize an icon/display style value into a candidate executable path:
/// strip quotes, drop a trailing `,<index>` resource suffix, truncate after
/// the first `.exe`, expand environment references.
pub(crate) fn sanitize_exe_candidate(raw: &str) -> Option<String> {
    let mut value = raw.trim().trim_matches('"').to_string();
    if value.is_empty() {
        return None;
    }
    value = ICON_INDEX_RE.replace(&value, "").into_owned();
    if let Some(idx) = value.to_ascii_lowercase().find(".exe") {
        value.truncate(idx + 4);
    }
    let value = expand_env_vars(&value);
    if value.is_empty() { None } else { Some(value) }
}

fn sanitize_exe_path(raw: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(sanitize_exe_candidate(raw)?);
    candidate.is_file().then_some(candidate)
}

/// Pull a quoted or bare `<drive>:\...\*.exe` path out of an uninstaller
/// command line, without checking the filesystem.
pub(crate) fn command_exe_candidate(raw: &str) -> Option<String> {
    let value = expand_env_vars(raw.trim());
    if let Some(caps) = QUOTED_EXE_RE.captures(&value) {
        return Some(caps[1].to_string());
    }
    BARE_EXE_RE
        .captures(&value)
        .map(|caps| caps[1].to_string())
}

struct IconPath;

impl ResolutionStrategy for IconPath {
    fn name(&self) -> &'static str {
        "icon-path"
    }

    fn resolve(&self, hints: &ResolutionHints) -> Option<PathBuf> {
        sanitize_exe_path(hints.display_icon.as_deref()?)
    }
}

struct UninstallerPath;

impl ResolutionStrategy for UninstallerPath {
    fn name(&self) -> &'static str {
        "uninstaller-path"
    }

    fn resolve(&self, hints: &ResolutionHints) -> Option<PathBuf> {
        sanitize_exe_path(hints.uninstall_string.as_deref()?)
    }
}

struct UninstallerCommand;

impl ResolutionStrategy for UninstallerCommand {
    fn name(&self) -> &'static str {
        "uninstaller-command"
    }

    fn resolve(&self, hints: &ResolutionHints) -> Option<PathBuf> {
        let candidate = PathBuf::from(command_exe_candidate(
            hints.uninstall_string.as_deref()?,
        )?);
        candidate.is_file().then_some(candidate)
    }
}

struct InstallDirScan;

impl ResolutionStrategy for InstallDirScan {
    fn name(&self) -> &'static str {
        "install-dir-scan"
    }

    fn resolve(&self, hints: &ResolutionHints) -> Option<PathBuf> {
        let dir = hints.install_location.as_deref()?.trim().trim_matches('"');
        if dir.is_empty() || !Path::new(dir).is_dir() {
            return None;
        }
        // Immediate children only; installers drop the main binary at the top
        // of the install location when they record one at all.
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_exe = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_ascii_lowercase().ends_with(".exe"))
                .unwrap_or(false);
            if is_exe && path.is_file() {
                return Some(path);
            }
        }
        None
    }
}

struct PathLookup;

impl ResolutionStrategy for PathLookup {
    fn name(&self) -> &'static str {
        "path-lookup"
    }

    fn resolve(&self, hints: &ResolutionHints) -> Option<PathBuf> {
        let name = hints.app_name.trim().to_lowercase();
        for (known, executables) in KNOWN_EXECUTABLES {
            if !name.contains(known) {
                continue;
            }
            for exe in *executables {
                if let Ok(path) = which::which(exe) {
                    if path.is_file() {
                        return Some(path);
                    }
                }
            }
        }
        None
    }
}
