use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::model::{BorderStyle, Layout, Match};

pub fn config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config")).join("tessera")
}

pub fn config_file() -> PathBuf { config_dir().join("config.toml") }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub drag: DragSettings,
    #[serde(default, rename = "assign")]
    pub assignments: Vec<Assignment>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_border_width")]
    pub border_width: i32,
    /// Height of the title band drawn above a window.
    #[serde(default = "default_deco_height")]
    pub deco_height: i32,
    #[serde(default)]
    pub default_border: BorderStyle,
    #[serde(default)]
    pub default_floating_border: BorderStyle,
    /// Layout of the split container new workspace children are wrapped in.
    /// `default` means no wrapping.
    #[serde(default)]
    pub workspace_layout: Layout,
    #[serde(default)]
    pub default_orientation: DefaultOrientation,
    #[serde(default = "yes")]
    pub focus_follows_mouse: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefaultOrientation {
    Horizontal,
    Vertical,
    /// Horizontal on landscape outputs, vertical on portrait ones.
    #[default]
    Auto,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DragSettings {
    /// Pointer travel in pixels before a press turns into a drag.
    #[serde(default = "default_drag_threshold")]
    pub threshold: i32,
    /// Distance from an edge within which a drop becomes a sibling drop.
    #[serde(default = "default_sibling_zone")]
    pub sibling_zone: i32,
    /// Distance from an edge within which a drop targets the parent.
    #[serde(default = "default_parent_zone")]
    pub parent_zone: i32,
}

/// Routes windows matching `criteria` to a workspace, an output, or a
/// command for the caller to run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Assignment {
    #[serde(default)]
    pub criteria: Match,
    pub workspace: Option<String>,
    pub output: Option<String>,
    pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignTarget<'a> {
    Workspace(&'a str),
    Output(&'a str),
    Command(&'a str),
}

impl Assignment {
    /// The single target of this rule, or `None` if it names zero or several.
    pub fn target(&self) -> Option<AssignTarget<'_>> {
        match (&self.workspace, &self.output, &self.command) {
            (Some(ws), None, None) => Some(AssignTarget::Workspace(ws)),
            (None, Some(out), None) => Some(AssignTarget::Output(out)),
            (None, None, Some(cmd)) => Some(AssignTarget::Command(cmd)),
            _ => None,
        }
    }

    /// Rules without criteria would capture every window and are skipped.
    pub fn is_usable(&self) -> bool { !self.criteria.is_empty() && self.target().is_some() }
}

fn yes() -> bool { true }
fn default_border_width() -> i32 { 2 }
fn default_deco_height() -> i32 { 18 }
fn default_drag_threshold() -> i32 { 5 }
fn default_sibling_zone() -> i32 { 60 }
fn default_parent_zone() -> i32 { 15 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            border_width: default_border_width(),
            deco_height: default_deco_height(),
            default_border: BorderStyle::Normal,
            default_floating_border: BorderStyle::Normal,
            workspace_layout: Layout::Default,
            default_orientation: DefaultOrientation::Auto,
            focus_follows_mouse: true,
        }
    }
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            threshold: default_drag_threshold(),
            sibling_zone: default_sibling_zone(),
            parent_zone: default_parent_zone(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.border_width < 0 {
            issues.push(format!("border_width must be non-negative, got {}", self.border_width));
        }
        if self.deco_height < 0 {
            issues.push(format!("deco_height must be non-negative, got {}", self.deco_height));
        }
        if matches!(self.workspace_layout, Layout::Dockarea | Layout::Output) {
            issues.push(format!(
                "workspace_layout must be default, stacked or tabbed, got {}",
                self.workspace_layout
            ));
        }

        issues
    }
}

impl DragSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.threshold < 0 {
            issues.push(format!("drag.threshold must be non-negative, got {}", self.threshold));
        }
        if self.parent_zone < 0 || self.sibling_zone < 0 {
            issues.push("drag zones must be non-negative".to_owned());
        }
        if self.parent_zone > self.sibling_zone {
            issues.push(format!(
                "drag.parent_zone ({}) must not exceed drag.sibling_zone ({})",
                self.parent_zone, self.sibling_zone
            ));
        }

        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> { Ok(toml::from_str::<Config>(buf)?) }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.settings.validate());
        issues.extend(self.drag.validate());

        for (i, rule) in self.assignments.iter().enumerate() {
            if rule.criteria.is_empty() {
                issues.push(format!("assign[{i}] has no criteria and will be ignored"));
            }
            if rule.target().is_none() {
                issues.push(format!(
                    "assign[{i}] must name exactly one of workspace, output or command"
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn parses_settings_and_assignments() {
        let cfg = Config::parse(
            r#"
            [settings]
            border_width = 1
            default_border = "pixel"
            workspace_layout = "tabbed"

            [drag]
            parent_zone = 10

            [[assign]]
            workspace = "2"
            criteria = { class = "^Firefox$" }

            [[assign]]
            command = "notify-send hi"
            criteria = { title = "hello", dock = "none" }
            "#,
        )
        .unwrap();

        assert_eq!(cfg.settings.border_width, 1);
        assert_eq!(cfg.settings.default_border, BorderStyle::Pixel);
        assert_eq!(cfg.settings.workspace_layout, Layout::Tabbed);
        assert_eq!(cfg.drag.parent_zone, 10);
        assert_eq!(cfg.drag.sibling_zone, 60);
        assert_eq!(cfg.assignments.len(), 2);
        assert_eq!(cfg.assignments[0].target(), Some(AssignTarget::Workspace("2")));
        assert_eq!(cfg.assignments[1].target(), Some(AssignTarget::Command("notify-send hi")));
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Config::parse("[settings]\nborder_colour = 3\n").is_err());
        assert!(Config::parse("[[assign]]\nworkspace = \"1\"\ncriteria = { klass = \"x\" }\n").is_err());
    }

    #[test]
    fn rejects_invalid_regex() {
        assert!(Config::parse("[[assign]]\nworkspace = \"1\"\ncriteria = { class = \"(\" }\n").is_err());
    }

    #[test]
    fn validate_reports_problems() {
        let mut cfg = Config::default();
        cfg.drag.parent_zone = 100;
        cfg.settings.workspace_layout = Layout::Dockarea;
        cfg.assignments.push(Assignment {
            criteria: Match::default(),
            workspace: Some("1".into()),
            output: Some("HDMI-1".into()),
            command: None,
        });
        let issues = cfg.validate();
        assert_eq!(issues.len(), 4, "{issues:?}");
        assert!(!cfg.assignments[0].is_usable());
    }

    #[test]
    fn save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.settings.deco_height = 22;
        cfg.assignments.push(Assignment {
            criteria: Match::class("^mpv$").unwrap(),
            workspace: None,
            output: Some("DP-1".into()),
            command: None,
        });
        cfg.save(&path).unwrap();
        let read = Config::read(&path).unwrap();
        assert_eq!(read, cfg);
    }

    #[test]
    fn read_missing_file_mentions_path() {
        let err = Config::read(Path::new("/nonexistent/tessera.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/tessera.toml"));
    }
}
