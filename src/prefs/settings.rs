use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;

/// Fertilizer policy used when replanting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fertilizer {
    Both,
    Normal,
    Organic,
    None,
}

impl Fertilizer {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "both" => Some(Fertilizer::Both),
            "normal" => Some(Fertilizer::Normal),
            "organic" => Some(Fertilizer::Organic),
            "none" => Some(Fertilizer::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantingStrategy {
    /// Plant the operator's preferred seed
    Preferred,
    /// Plant the highest-level seed available
    Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

/// Feature toggles for the automation loops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub farm: bool,
    /// React to land push notifications immediately
    pub farm_push: bool,
    pub land_upgrade: bool,
    pub friend: bool,
    pub friend_steal: bool,
    pub friend_help: bool,
    pub friend_bad: bool,
    /// Daily tasks, including mailbox reward claiming
    pub task: bool,
    pub sell: bool,
    pub fertilizer: Fertilizer,
}

impl Default for Automation {
    fn default() -> Self {
        Self {
            farm: true,
            farm_push: true,
            land_upgrade: true,
            friend: true,
            friend_steal: true,
            friend_help: true,
            friend_bad: false,
            task: true,
            sell: true,
            fertilizer: Fertilizer::Both,
        }
    }
}

impl Automation {
    fn toggle_mut(&mut self, key: &str) -> Option<&mut bool> {
        match key {
            "farm" => Some(&mut self.farm),
            "farm_push" => Some(&mut self.farm_push),
            "land_upgrade" => Some(&mut self.land_upgrade),
            "friend" => Some(&mut self.friend),
            "friend_steal" => Some(&mut self.friend_steal),
            "friend_help" => Some(&mut self.friend_help),
            "friend_bad" => Some(&mut self.friend_bad),
            "task" => Some(&mut self.task),
            "sell" => Some(&mut self.sell),
            _ => None,
        }
    }

    pub fn is_on(&self, key: &str) -> bool {
        match key {
            "farm" => self.farm,
            "farm_push" => self.farm_push,
            "land_upgrade" => self.land_upgrade,
            "friend" => self.friend,
            "friend_steal" => self.friend_steal,
            "friend_help" => self.friend_help,
            "friend_bad" => self.friend_bad,
            "task" => self.task,
            "sell" => self.sell,
            _ => false,
        }
    }

    /// Apply one key. Unknown keys are ignored; an invalid fertilizer value
    /// keeps the current one; every other value is read as a truthy flag.
    fn apply(&mut self, key: &str, value: &Value) {
        if key == "fertilizer" {
            if let Some(f) = value.as_str().and_then(Fertilizer::parse) {
                self.fertilizer = f;
            }
            return;
        }
        match self.toggle_mut(key) {
            Some(flag) => *flag = truthy(value),
            None => debug!(key, "Ignoring unknown automation key"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
    /// Seconds between farm patrols
    pub farm: u64,
    /// Seconds between friend visits
    pub friend: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self { farm: 2, friend: 10 }
    }
}

impl Intervals {
    fn slot_mut(&mut self, kind: &str) -> Option<&mut u64> {
        match kind {
            "farm" => Some(&mut self.farm),
            "friend" => Some(&mut self.friend),
            _ => None,
        }
    }
}

/// Window in which friend interactions are skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    pub start: String,
    pub end: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "23:00".to_string(),
            end: "07:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPrefs {
    pub theme: Theme,
}

impl Default for UiPrefs {
    fn default() -> Self {
        Self { theme: Theme::Dark }
    }
}

/// Operator preferences persisted in `store.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub automation: Automation,
    pub planting_strategy: PlantingStrategy,
    pub preferred_seed_id: u64,
    pub intervals: Intervals,
    pub friend_quiet_hours: QuietHours,
    pub ui: UiPrefs,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            automation: Automation::default(),
            planting_strategy: PlantingStrategy::Preferred,
            preferred_seed_id: 0,
            intervals: Intervals::default(),
            friend_quiet_hours: QuietHours::default(),
            ui: UiPrefs::default(),
        }
    }
}

/// Partial update. Every field is loosely typed because it comes from
/// hand-edited files or CLI input and is normalized on apply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub automation: BTreeMap<String, Value>,
    pub planting_strategy: Option<String>,
    pub preferred_seed_id: Option<Value>,
    #[serde(default)]
    pub intervals: BTreeMap<String, Value>,
    pub friend_quiet_hours: Option<QuietHoursPatch>,
    pub ui: Option<UiPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuietHoursPatch {
    pub enabled: Option<Value>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UiPatch {
    pub theme: Option<String>,
}

impl Settings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        for (key, value) in &patch.automation {
            self.automation.apply(key, value);
        }

        if let Some(strategy) = patch.planting_strategy.as_deref() {
            match strategy {
                "preferred" => self.planting_strategy = PlantingStrategy::Preferred,
                "level" => self.planting_strategy = PlantingStrategy::Level,
                _ => {}
            }
        }

        if let Some(seed) = patch.preferred_seed_id.as_ref().filter(|v| !v.is_null()) {
            self.preferred_seed_id = parse_int(seed).unwrap_or(0).max(0) as u64;
        }

        for (kind, secs) in &patch.intervals {
            if let Some(slot) = self.intervals.slot_mut(kind) {
                *slot = parse_int(secs).filter(|n| *n != 0).unwrap_or(60).max(1) as u64;
            }
        }

        if let Some(quiet) = &patch.friend_quiet_hours {
            let old = &self.friend_quiet_hours;
            self.friend_quiet_hours = QuietHours {
                enabled: quiet.enabled.as_ref().map(truthy).unwrap_or(old.enabled),
                start: normalize_time(quiet.start.as_deref(), &old.start),
                end: normalize_time(quiet.end.as_deref(), &old.end),
            };
        }

        if let Some(theme) = patch.ui.as_ref().and_then(|ui| ui.theme.as_deref()) {
            match theme.to_lowercase().as_str() {
                "dark" => self.ui.theme = Theme::Dark,
                "light" => self.ui.theme = Theme::Light,
                _ => {}
            }
        }
    }
}

/// `HH:MM` with hour clamped to 0..=23 and minute to 0..=59. Anything that
/// does not look like `H:M` yields the fallback.
pub fn normalize_time(input: Option<&str>, fallback: &str) -> String {
    let parsed = input.map(str::trim).and_then(|s| {
        let (h, m) = s.split_once(':')?;
        let valid = |part: &str| {
            (1..=2).contains(&part.len()) && part.chars().all(|c| c.is_ascii_digit())
        };
        if !valid(h) || !valid(m) {
            return None;
        }
        Some((h.parse::<u32>().ok()?.min(23), m.parse::<u32>().ok()?.min(59)))
    });

    match parsed {
        Some((h, m)) => format!("{:02}:{:02}", h, m),
        None => fallback.to_string(),
    }
}

/// Integer prefix of a number or string, the way loose form input is read
fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// File-backed settings. Every successful change is written back
/// immediately; the last write wins.
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Load from `path`, layering the file over the defaults. A missing or
    /// unreadable file leaves the defaults in place.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut settings = Settings::default();

        if path.exists() {
            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|raw| Ok(serde_json::from_str::<SettingsPatch>(&raw)?))
            {
                Ok(patch) => settings.apply(&patch),
                Err(e) => warn!("Failed to load settings from {}: {}", path.display(), e),
            }
        }

        Self { path, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply a patch and optionally persist it. Returns the new snapshot.
    pub fn apply(&mut self, patch: &SettingsPatch, persist: bool) -> Result<Settings> {
        self.settings.apply(patch);
        if persist {
            self.save()?;
        }
        Ok(self.settings.clone())
    }

    pub fn set_automation(&mut self, key: &str, value: Value) -> Result<Settings> {
        let mut patch = SettingsPatch::default();
        patch.automation.insert(key.to_string(), value);
        self.apply(&patch, true)
    }

    pub fn set_interval(&mut self, kind: &str, seconds: Value) -> Result<Settings> {
        let mut patch = SettingsPatch::default();
        patch.intervals.insert(kind.to_string(), seconds);
        self.apply(&patch, true)
    }

    pub fn set_planting_strategy(&mut self, strategy: &str) -> Result<Settings> {
        self.apply(
            &SettingsPatch {
                planting_strategy: Some(strategy.to_string()),
                ..Default::default()
            },
            true,
        )
    }

    pub fn set_preferred_seed(&mut self, seed: Value) -> Result<Settings> {
        self.apply(
            &SettingsPatch {
                preferred_seed_id: Some(seed),
                ..Default::default()
            },
            true,
        )
    }

    pub fn set_quiet_hours(&mut self, quiet: QuietHoursPatch) -> Result<Settings> {
        self.apply(
            &SettingsPatch {
                friend_quiet_hours: Some(quiet),
                ..Default::default()
            },
            true,
        )
    }

    /// Anything other than "light" selects the dark theme
    pub fn set_theme(&mut self, theme: &str) -> Result<Settings> {
        let theme = if theme.eq_ignore_ascii_case("light") {
            "light"
        } else {
            "dark"
        };
        self.apply(
            &SettingsPatch {
                ui: Some(UiPatch {
                    theme: Some(theme.to_string()),
                }),
                ..Default::default()
            },
            true,
        )
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        debug!("Saving settings to {}", self.path.display());
        fs::write(&self.path, serde_json::to_string_pretty(&self.settings)?)?;
        Ok(())
    }
}
