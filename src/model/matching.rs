//! Window criteria.
//!
//! A [`Match`] is a conjunction of optional predicates. Unset fields are not
//! checked, so a match with every field unset accepts any window; callers that
//! route windows (assignments) must reject such a match themselves.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use super::window::{Dock, Window};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockMatch {
    /// Any dock window, top or bottom.
    Any,
    Top,
    Bottom,
    /// Only windows that are not docks.
    None,
}

#[serde_as]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Match {
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub class: Option<Regex>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub instance: Option<Regex>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub title: Option<Regex>,
    pub window_id: Option<u32>,
    pub dock: Option<DockMatch>,
}

impl PartialEq for Match {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: &Option<Regex>, b: &Option<Regex>) -> bool {
            a.as_ref().map(Regex::as_str) == b.as_ref().map(Regex::as_str)
        }
        same(&self.class, &other.class)
            && same(&self.instance, &other.instance)
            && same(&self.title, &other.title)
            && self.window_id == other.window_id
            && self.dock == other.dock
    }
}

impl Match {
    pub fn class(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Match { class: Some(Regex::new(pattern)?), ..Match::default() })
    }

    pub fn instance(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Match { instance: Some(Regex::new(pattern)?), ..Match::default() })
    }

    pub fn title(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Match { title: Some(Regex::new(pattern)?), ..Match::default() })
    }

    pub fn window_id(id: u32) -> Self { Match { window_id: Some(id), ..Match::default() } }

    pub fn dock(dock: DockMatch) -> Self { Match { dock: Some(dock), ..Match::default() } }

    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.class.is_none()
            && self.instance.is_none()
            && self.title.is_none()
            && self.window_id.is_none()
            && self.dock.is_none()
    }

    /// Checks every set criterion against `window`, stopping at the first one
    /// that fails.
    pub fn matches(&self, window: &Window) -> bool {
        fn text(re: &Option<Regex>, value: &Option<String>) -> bool {
            match re {
                None => true,
                Some(re) => value.as_deref().is_some_and(|v| re.is_match(v)),
            }
        }

        if !text(&self.class, &window.class) {
            return false;
        }
        if !text(&self.instance, &window.instance) {
            return false;
        }
        if !text(&self.title, &window.title) {
            return false;
        }
        if let Some(id) = self.window_id {
            if window.handle.0 != id {
                return false;
            }
        }
        if let Some(dock) = self.dock {
            let ok = match (dock, window.dock) {
                (DockMatch::Any, d) => d.is_dock(),
                (DockMatch::Top, Dock::Top) | (DockMatch::Bottom, Dock::Bottom) => true,
                (DockMatch::None, Dock::None) => true,
                _ => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }
}
