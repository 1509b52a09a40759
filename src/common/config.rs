use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::layout_engine::LayoutKind;

pub const MAX_GAP_STEPS: u32 = 32;

pub fn config_file() -> Option<PathBuf> { dirs::home_dir().map(|home| home.join(".tiler.toml")) }

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct Config {
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// How often the host should drain one deferred task, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub layout: LayoutSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            layout: LayoutSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default)]
    pub gaps: GapSettings,
    #[serde(default)]
    pub tiling: TilingSettings,
    #[serde(default)]
    pub drop: DropSettings,
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Number of increments between windows and around the tiling area.
    #[serde(default = "default_gap_size")]
    pub size: u32,
    /// Pixels per gap step.
    #[serde(default = "default_gap_increment")]
    pub increment: u32,
    /// Drop the gap entirely when a monitor holds a single tiled window.
    #[serde(default)]
    pub hide_when_single: bool,
}

impl Default for GapSettings {
    fn default() -> Self {
        Self {
            size: default_gap_size(),
            increment: default_gap_increment(),
            hide_when_single: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TilingSettings {
    /// Workspace indices (0 based) whose windows are never tiled.
    #[serde(default)]
    pub skip_workspaces: Vec<usize>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct DropSettings {
    /// Fraction of the target window used for the edge hit regions.
    #[serde(default = "default_hover_margin")]
    pub hover_margin: f64,
    /// Fraction of the target window covered by the edge preview hint.
    #[serde(default = "default_preview_margin")]
    pub preview_margin: f64,
    /// Layout of the container created when dropping onto the center of a
    /// window that sits directly on a monitor.
    #[serde(default)]
    pub center_layout: CenterDropLayout,
}

impl Default for DropSettings {
    fn default() -> Self {
        Self {
            hover_margin: default_hover_margin(),
            preview_margin: default_preview_margin(),
            center_layout: CenterDropLayout::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum CenterDropLayout {
    Stacked,
    #[default]
    Tabbed,
}

impl From<CenterDropLayout> for LayoutKind {
    fn from(value: CenterDropLayout) -> Self {
        match value {
            CenterDropLayout::Stacked => LayoutKind::Stacked,
            CenterDropLayout::Tabbed => LayoutKind::Tabbed,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.tick_interval_ms == 0 {
            issues.push("tick_interval_ms must be positive".to_string());
        }

        issues.extend(self.layout.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.tick_interval_ms == 0 {
            self.tick_interval_ms = default_tick_interval_ms();
            fixes += 1;
        }

        fixes += self.layout.auto_fix_values();

        fixes
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.gaps.validate());

        issues.extend(self.drop.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let gap_fixes = self.gaps.auto_fix_values();
        let drop_fixes = self.drop.auto_fix_values();

        gap_fixes + drop_fixes
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.size > MAX_GAP_STEPS {
            issues.push(format!(
                "gaps.size should not exceed {MAX_GAP_STEPS}, got {}",
                self.size
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.size > MAX_GAP_STEPS {
            self.size = MAX_GAP_STEPS;
            fixes += 1;
        }

        fixes
    }
}

impl DropSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(0.0..=0.5).contains(&self.hover_margin) {
            issues.push(format!(
                "drop.hover_margin must be between 0 and 0.5, got {}",
                self.hover_margin
            ));
        }

        if !(0.0..=1.0).contains(&self.preview_margin) {
            issues.push(format!(
                "drop.preview_margin must be between 0 and 1, got {}",
                self.preview_margin
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if !(0.0..=0.5).contains(&self.hover_margin) {
            self.hover_margin = default_hover_margin();
            fixes += 1;
        }

        if !(0.0..=1.0).contains(&self.preview_margin) {
            self.preview_margin = default_preview_margin();
            fixes += 1;
        }

        fixes
    }
}

fn default_tick_interval_ms() -> u64 { 220 }

fn default_gap_size() -> u32 { 4 }

fn default_gap_increment() -> u32 { 1 }

fn default_hover_margin() -> f64 { 0.3 }

fn default_preview_margin() -> f64 { 0.5 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Loads the user's config file if there is one, falling back to the
    /// built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Config> {
        match path {
            Some(path) if path.exists() => Self::read(path),
            _ => Self::parse(include_str!("../../tiler.default.toml")),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile { settings: self.settings.clone() };

        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        Ok(Config { settings: c.settings })
    }
}
