//! Saving and restoring workspace layouts.
//!
//! A saved layout is JSON describing split containers and placeholder
//! leaves. Placeholders carry swallow criteria; when a matching window is
//! mapped later it takes the placeholder's place in the tree.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::WindowManager;
use crate::layout_engine::Orientation;
use crate::model::{BorderStyle, Con, ConId, ConType, Layout, Match};
use crate::sync::DisplayConnection;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid layout: {0}")]
    Structure(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RestoreNode {
    pub layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<BorderStyle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub swallows: Vec<Match>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<RestoreNode>,
}

/// A file holds one node or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum LayoutFile {
    Many(Vec<RestoreNode>),
    One(RestoreNode),
}

impl RestoreNode {
    fn check(&self) -> Result<(), RestoreError> {
        if matches!(self.layout, Layout::Dockarea | Layout::Output) {
            return Err(RestoreError::Structure(format!(
                "layout {} is reserved for outputs and docks",
                self.layout
            )));
        }
        if let Some(p) = self.percent {
            if !(p > 0.0 && p <= 1.0) {
                return Err(RestoreError::Structure(format!("percent {p} is outside (0, 1]")));
            }
        }
        if self.nodes.is_empty() && self.swallows.iter().any(Match::is_empty) {
            return Err(RestoreError::Structure(
                "empty swallow criteria would claim every window".to_owned(),
            ));
        }
        self.nodes.iter().try_for_each(RestoreNode::check)
    }
}

impl<D: DisplayConnection> WindowManager<D> {
    /// Builds the containers described by `json` under workspace `ws`.
    /// Nothing is changed if the description is invalid.
    pub fn restore_layout(&mut self, ws: ConId, json: &str) -> Result<Vec<ConId>, RestoreError> {
        if self.tree[ws].kind != ConType::Workspace {
            return Err(RestoreError::Structure("layouts are restored onto workspaces".to_owned()));
        }
        let nodes = match serde_json::from_str(json)? {
            LayoutFile::Many(nodes) => nodes,
            LayoutFile::One(node) => vec![node],
        };
        nodes.iter().try_for_each(RestoreNode::check)?;

        let mut created = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let id = self.build_restored(node);
            self.attach(id, ws, true);
            created.push(id);
        }
        self.fix_percent(ws);
        debug!(?ws, count = created.len(), "restored layout");
        Ok(created)
    }

    fn build_restored(&mut self, node: &RestoreNode) -> ConId {
        let mut con = Con::new(ConType::Con).with_layout(node.layout);
        con.orientation = match (node.orientation, node.nodes.is_empty(), node.layout) {
            (Some(o), _, _) => Some(o),
            (None, false, Layout::Default) => Some(Orientation::Horizontal),
            (None, _, _) => None,
        };
        con.percent = node.percent.unwrap_or(0.0);
        con.border_style = node.border.unwrap_or(self.config.settings.default_border);
        con.swallows = node.swallows.clone();
        let id = self.tree.mk_con(con);
        for child in &node.nodes {
            let child = self.build_restored(child);
            self.attach(child, id, true);
        }
        if !node.nodes.is_empty() {
            self.fix_percent(id);
        }
        id
    }

    /// Describes the tiling subtree of `id` in the form
    /// [`restore_layout`](Self::restore_layout) reads. Windows become
    /// placeholders that swallow their window's class.
    pub fn snapshot_layout(&self, id: ConId) -> RestoreNode {
        let map = &self.tree.map;
        let con = &map[id];
        let swallows = match con.window.as_ref().and_then(|w| w.class.as_deref()) {
            Some(class) => Match::class(&format!("^{}$", regex::escape(class))).into_iter().collect(),
            None => con.swallows.clone(),
        };
        RestoreNode {
            layout: con.layout,
            orientation: con.orientation,
            percent: (con.percent > 0.0).then_some(con.percent),
            border: Some(con.border_style),
            swallows,
            nodes: id.nodes(map).iter().map(|&c| self.snapshot_layout(c)).collect(),
        }
    }

    /// JSON for every tiling child of workspace `ws`.
    pub fn save_layout(&self, ws: ConId) -> Result<String, RestoreError> {
        let nodes: Vec<RestoreNode> =
            ws.nodes(&self.tree.map).iter().map(|&c| self.snapshot_layout(c)).collect();
        Ok(serde_json::to_string_pretty(&nodes)?)
    }
}
