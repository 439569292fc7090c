//! Application search, the default provider.
//!
//! Scans XDG `.desktop` entries from the standard data directories plus any
//! configured extras, fuzzy-matches queries against names and keywords, and
//! blends match scores with frecency so habitual launches rank first. The
//! empty query returns the frecency-ordered application list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{Provider, ProviderError};
use crate::action::Action;
use crate::config::AppsConfig;
use crate::frecency::UsageTracker;
use crate::item::ResultItem;
use crate::metrics;

/// Keyword matches rank slightly below name matches.
const KEYWORD_PENALTY: i64 = 5;

/// Comment matches rank below keyword matches.
const COMMENT_PENALTY: i64 = 8;

/// One parsed desktop entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AppEntry {
    pub name: String,
    pub exec: String,
    pub icon: Option<String>,
    pub comment: String,
    pub keywords: Vec<String>,
    pub entry_path: PathBuf,
}

pub struct AppsProvider {
    scan_dirs: Vec<PathBuf>,
    include_hidden: bool,
    usage: Arc<UsageTracker>,
    apps: RwLock<Vec<AppEntry>>,
}

impl AppsProvider {
    /// Scan the standard XDG application directories plus the configured
    /// extras. User directories come first so their entries shadow
    /// system-wide ones with the same desktop-file name.
    pub fn new(config: &AppsConfig, usage: Arc<UsageTracker>) -> Self {
        let mut dirs = xdg_application_dirs();
        dirs.extend(config.extra_dirs.iter().cloned());
        Self::with_dirs(dirs, config.include_hidden, usage)
    }

    /// Scan exactly `scan_dirs`, earliest directory winning on name clashes.
    pub fn with_dirs(
        scan_dirs: Vec<PathBuf>,
        include_hidden: bool,
        usage: Arc<UsageTracker>,
    ) -> Self {
        let provider = Self {
            scan_dirs,
            include_hidden,
            usage,
            apps: RwLock::new(Vec::new()),
        };
        provider.rescan();
        provider
    }

    fn apps(&self) -> std::sync::RwLockReadGuard<'_, Vec<AppEntry>> {
        self.apps.read().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - the list is replaced
            // wholesale on rescan, never partially mutated
            poisoned.into_inner()
        })
    }

    /// Rescan all directories and swap in the fresh list.
    fn rescan(&self) {
        let mut entries = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for dir in &self.scan_dirs {
            if !dir.is_dir() {
                continue;
            }
            for file in WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let path = file.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("desktop") {
                    continue;
                }

                let file_name = match path.file_name().and_then(|n| n.to_str()) {
                    Some(name) => name.to_string(),
                    None => continue,
                };
                if seen.contains(&file_name) {
                    continue;
                }

                match parse_desktop_entry(path, self.include_hidden) {
                    Some(entry) => {
                        seen.insert(file_name);
                        entries.push(entry);
                    }
                    None => continue,
                }
            }
        }

        entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        debug!("Indexed {} applications", entries.len());
        metrics::INDEXED_APPS.set(entries.len() as f64);

        let mut apps = self.apps.write().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - the list is replaced
            // wholesale on rescan, never partially mutated
            poisoned.into_inner()
        });
        *apps = entries;
    }

    fn to_item(&self, entry: &AppEntry) -> ResultItem {
        let mut item = ResultItem::new(&entry.name, self.name())
            .with_subtitle(&entry.comment)
            .with_action(Action::Shell {
                command: entry.exec.clone(),
            })
            .with_metadata("desktop_entry", entry.entry_path.to_string_lossy());
        if let Some(icon) = &entry.icon {
            item = item.with_icon(icon.clone());
        }
        item
    }
}

#[async_trait]
impl Provider for AppsProvider {
    fn name(&self) -> &'static str {
        "apps"
    }

    async fn populate(&self, query: &str) -> Result<Vec<ResultItem>, ProviderError> {
        let query = query.trim();
        let apps = self.apps();

        if query.is_empty() {
            // Frecency order, alphabetical for never-launched apps.
            let mut ranked: Vec<(&AppEntry, f64)> = apps
                .iter()
                .map(|entry| (entry, self.usage.score(&entry.name)))
                .collect();
            ranked.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.name.cmp(&b.0.name))
            });
            return Ok(ranked.into_iter().map(|(entry, _)| self.to_item(entry)).collect());
        }

        let matcher = SkimMatcherV2::default();
        let mut ranked: Vec<(&AppEntry, f64)> = apps
            .iter()
            .filter_map(|entry| {
                match_app(&matcher, entry, query)
                    .map(|score| (entry, score as f64 + self.usage.score(&entry.name)))
            })
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked.into_iter().map(|(entry, _)| self.to_item(entry)).collect())
    }

    fn fingerprint(&self) -> Option<String> {
        let apps = self.apps();
        let first = apps.first().map(|e| e.name.as_str()).unwrap_or("");
        let last = apps.last().map(|e| e.name.as_str()).unwrap_or("");
        Some(format!("{}:{}:{}", apps.len(), first, last))
    }

    async fn rebuild(&self) -> Result<(), ProviderError> {
        self.rescan();
        Ok(())
    }
}

/// Best fuzzy score for `query` against an entry, name first, keywords and
/// comment at a penalty.
fn match_app(matcher: &SkimMatcherV2, entry: &AppEntry, query: &str) -> Option<i64> {
    let mut best = matcher.fuzzy_match(&entry.name, query);

    for keyword in &entry.keywords {
        if keyword.is_empty() {
            continue;
        }
        if let Some(score) = matcher.fuzzy_match(keyword, query) {
            let score = score - KEYWORD_PENALTY;
            if best.map_or(true, |current| score > current) {
                best = Some(score);
            }
        }
    }

    if !entry.comment.is_empty() {
        if let Some(score) = matcher.fuzzy_match(&entry.comment, query) {
            let score = score - COMMENT_PENALTY;
            if best.map_or(true, |current| score > current) {
                best = Some(score);
            }
        }
    }

    best
}

/// Standard XDG application directories, user first.
fn xdg_application_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    match std::env::var_os("XDG_DATA_HOME") {
        Some(data_home) if !data_home.is_empty() => {
            dirs.push(PathBuf::from(data_home).join("applications"));
        }
        _ => {
            if let Some(home) = std::env::var_os("HOME") {
                dirs.push(PathBuf::from(home).join(".local/share/applications"));
            }
        }
    }

    let data_dirs = std::env::var("XDG_DATA_DIRS")
        .unwrap_or_else(|_| "/usr/local/share:/usr/share".to_string());
    for dir in data_dirs.split(':').filter(|d| !d.is_empty()) {
        dirs.push(PathBuf::from(dir).join("applications"));
    }

    dirs
}

/// Parse one `.desktop` file into an entry.
///
/// Returns `None` for non-application types, entries without a name or exec
/// line, `Hidden=true` entries, and (unless `include_hidden`) `NoDisplay`.
fn parse_desktop_entry(path: &Path, include_hidden: bool) -> Option<AppEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read desktop entry {:?}: {}", path, e);
            return None;
        }
    };

    let mut in_entry_section = false;
    let mut name = None;
    let mut exec = None;
    let mut icon = None;
    let mut comment = None;
    let mut generic_name = None;
    let mut keywords = Vec::new();
    let mut entry_type = None;
    let mut no_display = false;
    let mut hidden = false;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_entry_section = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry_section || line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();

        // Exact key matches only; localized variants like Name[de] are skipped.
        match key.trim() {
            "Name" => name = Some(value.to_string()),
            "Exec" => exec = Some(strip_field_codes(value)),
            "Icon" => icon = Some(value.to_string()),
            "Comment" => comment = Some(value.to_string()),
            "GenericName" => generic_name = Some(value.to_string()),
            "Keywords" => {
                keywords = value
                    .split(';')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "Type" => entry_type = Some(value.to_string()),
            "NoDisplay" => no_display = value.eq_ignore_ascii_case("true"),
            "Hidden" => hidden = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
    }

    // Hidden means the entry was deleted by the user; NoDisplay is a softer
    // "not for menus" that the config can override.
    if hidden || (no_display && !include_hidden) {
        return None;
    }
    if let Some(entry_type) = entry_type {
        if entry_type != "Application" {
            return None;
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    let exec = exec.filter(|e| !e.is_empty())?;

    Some(AppEntry {
        name,
        exec,
        icon: icon.filter(|i| !i.is_empty()),
        comment: comment.or(generic_name).unwrap_or_default(),
        keywords,
        entry_path: path.to_path_buf(),
    })
}

/// Drop `%f`-style field codes from an Exec line; `%%` unescapes to `%`.
fn strip_field_codes(exec: &str) -> String {
    exec.split_whitespace()
        .filter(|token| !(token.len() == 2 && token.starts_with('%') && *token != "%%"))
        .map(|token| token.replace("%%", "%"))
        .collect::<Vec<_>>()
        .join(" ")
}
