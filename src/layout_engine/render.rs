//! Geometry computation.
//!
//! `render` walks the tree from a container downwards and assigns `rect`,
//! `window_rect`, `deco_rect` and `mapped` to everything it visits. It never
//! talks to the display server; the only side channel is [`Stacking::raise`],
//! which records the order containers should be stacked in.

use std::collections::VecDeque;

use tracing::trace;

use super::Orientation;
use crate::common::config::Settings;
use crate::common::geometry::{Insets, Rect};
use crate::model::{BorderStyle, ConId, ConMap, ConType, FullscreenMode, Layout, SizeHints, Tree};

/// Receives the order in which rendered containers should be stacked; the
/// last one raised ends up on top.
pub trait Stacking {
    fn raise(&mut self, id: ConId);
}

impl Stacking for () {
    fn raise(&mut self, _id: ConId) {}
}

/// Where a leaf's title band is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Header {
    /// Inside the leaf's own rectangle, above the window.
    InRect,
    /// In the parent's header area (stacked and tabbed containers).
    Elsewhere,
    /// No decoration and no border: fullscreen windows and docks.
    Bare,
}

/// Recomputes geometry for `start` and everything below it.
pub fn render<O: Stacking>(tree: &mut Tree<O>, start: ConId, settings: &Settings) {
    let visited: Vec<ConId> = start.traverse_preorder(&tree.map).collect();
    for id in visited {
        tree[id].mapped = false;
    }
    let mut r = Renderer { tree, settings };
    match r.tree[start].kind {
        ConType::Root => r.render_root(start),
        ConType::Output => r.render_output(start),
        _ => r.render_con(start, Header::InRect),
    }
}

struct Renderer<'a, O> {
    tree: &'a mut Tree<O>,
    settings: &'a Settings,
}

impl<O: Stacking> Renderer<'_, O> {
    fn render_root(&mut self, root: ConId) {
        self.tree[root].mapped = true;
        if let Some(fs) = fullscreen_con(&self.tree.map, root, FullscreenMode::Global) {
            trace!(?fs, "global fullscreen");
            let rect = self.tree[root].rect;
            self.place_fullscreen(fs, rect);
            return;
        }
        let outputs = root.nodes(&self.tree.map).to_vec();
        for &output in &outputs {
            self.render_output(output);
        }
        // Floating containers go on top of every output's tiling layer.
        for output in outputs {
            let Some(ws) = visible_workspace(&self.tree.map, output) else {
                continue;
            };
            if fullscreen_con(&self.tree.map, ws, FullscreenMode::Output).is_none() {
                self.render_floating(ws);
            }
        }
    }

    fn render_output(&mut self, output: ConId) {
        self.tree[output].mapped = true;
        self.tree.data.raise(output);
        let rect = self.tree[output].rect;

        if let Some(ws) = visible_workspace(&self.tree.map, output) {
            if let Some(fs) = fullscreen_con(&self.tree.map, ws, FullscreenMode::Output) {
                trace!(?fs, ?output, "output fullscreen");
                self.place_fullscreen(fs, rect);
                return;
            }
        }

        let children = output.nodes(&self.tree.map).to_vec();
        let dock_total: i32 = children
            .iter()
            .filter(|&&c| self.tree[c].is_dockarea())
            .map(|&c| requested_height(&self.tree.map, c))
            .sum();
        let mut y = rect.y;
        for child in children {
            let height = if self.tree[child].is_dockarea() {
                requested_height(&self.tree.map, child)
            } else {
                (rect.height - dock_total).max(0)
            };
            let con = &mut self.tree[child];
            con.rect = Rect::new(rect.x, y, rect.width, height);
            con.deco_rect = Rect::default();
            y += height;
            if self.tree[child].is_dockarea() {
                self.render_con(child, Header::Bare);
            } else {
                self.render_content(child);
            }
        }
    }

    /// The content container shows exactly one workspace: the focused one.
    fn render_content(&mut self, content: ConId) {
        self.tree[content].mapped = true;
        let rect = self.tree[content].rect;
        let Some(ws) = content.first_focused(&self.tree.map) else {
            return;
        };
        self.tree[ws].rect = rect;
        self.tree[ws].deco_rect = Rect::default();
        self.render_con(ws, Header::InRect);
    }

    fn place_fullscreen(&mut self, fs: ConId, rect: Rect) {
        let con = &mut self.tree[fs];
        con.rect = rect;
        con.deco_rect = Rect::default();
        self.render_con(fs, Header::Bare);
    }

    fn render_floating(&mut self, ws: ConId) {
        let floating = ws.floating_nodes(&self.tree.map).to_vec();
        for fc in floating {
            self.tree[fc].mapped = true;
            self.tree.data.raise(fc);
            let rect = self.tree[fc].rect;
            self.tree[fc].window_rect = rect;
            for child in fc.nodes(&self.tree.map).to_vec() {
                self.assign_split_slot(child, rect);
                self.render_con(child, Header::InRect);
            }
        }
    }

    /// Renders a container whose `rect` and `deco_rect` the caller already set.
    fn render_con(&mut self, id: ConId, header: Header) {
        self.tree[id].mapped = true;
        self.tree.data.raise(id);

        if id.nodes(&self.tree.map).is_empty() {
            let con = &self.tree[id];
            let window_rect = if con.kind == ConType::Workspace {
                con.rect
            } else {
                leaf_window_rect(&self.tree.map, id, header, self.settings)
            };
            self.tree[id].window_rect = window_rect;
            return;
        }

        let rect = self.tree[id].rect;
        self.tree[id].window_rect = rect;
        match self.tree[id].layout {
            Layout::Default => self.render_split(id),
            Layout::Stacked | Layout::Tabbed => self.render_stack(id),
            Layout::Dockarea => self.render_dockarea(id),
            Layout::Output => self.render_output(id),
        }
    }

    fn assign_split_slot(&mut self, child: ConId, slot: Rect) {
        let is_leaf = child.nodes(&self.tree.map).is_empty();
        let deco_height = self.settings.deco_height;
        let con = &mut self.tree[child];
        con.rect = slot;
        con.deco_rect = if is_leaf && con.border_style == BorderStyle::Normal {
            Rect::new(slot.x, slot.y, slot.width, deco_height.min(slot.height))
        } else {
            Rect::default()
        };
    }

    fn render_split(&mut self, id: ConId) {
        let children = id.nodes(&self.tree.map).to_vec();
        assert!(!children.is_empty(), "rendering split container {id:?} with no children");
        let rect = self.tree[id].rect;
        let orientation = self.tree[id].orientation.unwrap_or(Orientation::Horizontal);
        let percents: Vec<f64> = children.iter().map(|&c| self.tree[c].percent).collect();
        let total = match orientation {
            Orientation::Horizontal => rect.width,
            Orientation::Vertical => rect.height,
        };
        let sizes = split_sizes(&percents, total);

        let mut offset = 0;
        for (child, size) in children.into_iter().zip(sizes) {
            let slot = match orientation {
                Orientation::Horizontal => Rect::new(rect.x + offset, rect.y, size, rect.height),
                Orientation::Vertical => Rect::new(rect.x, rect.y + offset, rect.width, size),
            };
            offset += size;
            self.assign_split_slot(child, slot);
            self.render_con(child, Header::InRect);
        }
    }

    /// Every child shares the body rectangle below the headers; only the
    /// focused one is shown, and it is rendered last so it ends up on top.
    fn render_stack(&mut self, id: ConId) {
        let map = &self.tree.map;
        let children = id.nodes(map).to_vec();
        assert!(!children.is_empty(), "rendering stacked container {id:?} with no children");
        let focused = id
            .focus_order(map)
            .iter()
            .copied()
            .find(|c| children.contains(c))
            .unwrap_or(children[0]);
        let rect = self.tree[id].rect;
        let h = self.settings.deco_height;
        let n = children.len() as i32;

        let (body, decos) = match self.tree[id].layout {
            Layout::Tabbed => {
                let widths = split_sizes(&vec![0.0; children.len()], rect.width);
                let mut x = rect.x;
                let decos: Vec<Rect> = widths
                    .into_iter()
                    .map(|w| {
                        let deco = Rect::new(x, rect.y, w, h.min(rect.height));
                        x += w;
                        deco
                    })
                    .collect();
                (rect.inset(Insets { top: h, ..Insets::default() }), decos)
            }
            _ => {
                let decos = (0..n)
                    .map(|i| Rect::new(rect.x, rect.y + i * h, rect.width, h))
                    .collect();
                (rect.inset(Insets { top: h * n, ..Insets::default() }), decos)
            }
        };

        for (&child, deco) in children.iter().zip(decos) {
            let con = &mut self.tree[child];
            con.rect = body;
            con.deco_rect = deco;
            if child != focused {
                con.window_rect = Rect::default();
            }
        }
        self.render_con(focused, Header::Elsewhere);
    }

    fn render_dockarea(&mut self, id: ConId) {
        let rect = self.tree[id].rect;
        let mut y = rect.y;
        for child in id.nodes(&self.tree.map).to_vec() {
            let height = requested_height(&self.tree.map, child);
            let con = &mut self.tree[child];
            con.rect = Rect::new(rect.x, y, rect.width, height);
            con.deco_rect = Rect::default();
            y += height;
            self.render_con(child, Header::Bare);
        }
    }
}

/// Splits `total` pixels according to `percents` (unset entries get an equal
/// share). Rounding error is handed out one pixel at a time from the first
/// child onwards, so the sizes always add up to `total`.
pub fn split_sizes(percents: &[f64], total: i32) -> Vec<i32> {
    assert!(!percents.is_empty(), "cannot split space between zero children");
    let n = percents.len() as f64;
    let mut sizes: Vec<i32> = percents
        .iter()
        .map(|&p| {
            let share = if p > 0.0 { p } else { 1.0 / n };
            (share * f64::from(total)).round() as i32
        })
        .collect();
    let mut assigned: i32 = sizes.iter().sum();
    let step = if assigned < total { 1 } else { -1 };
    while assigned != total {
        for size in sizes.iter_mut() {
            if assigned == total {
                break;
            }
            *size += step;
            assigned += step;
        }
    }
    sizes
}

/// The workspace currently shown on `output`.
pub fn visible_workspace(map: &ConMap, output: ConId) -> Option<ConId> {
    let content = output.nodes(map).iter().copied().find(|&c| !map[c].is_dockarea())?;
    content
        .first_focused(map)
        .filter(|&ws| map[ws].kind == ConType::Workspace)
}

/// First container below `start` (breadth first) in the given fullscreen mode.
pub fn fullscreen_con(map: &ConMap, start: ConId, mode: FullscreenMode) -> Option<ConId> {
    let mut queue: VecDeque<ConId> = start.children(map).collect();
    while let Some(id) = queue.pop_front() {
        if map[id].fullscreen_mode == mode {
            return Some(id);
        }
        queue.extend(id.children(map));
    }
    None
}

/// Height a dock client (or a dock area holding several) asks for.
fn requested_height(map: &ConMap, id: ConId) -> i32 {
    match &map[id].window {
        Some(window) => window.geometry.height.max(0),
        None => id.nodes(map).iter().map(|&c| requested_height(map, c)).sum(),
    }
}

fn leaf_window_rect(map: &ConMap, id: ConId, header: Header, settings: &Settings) -> Rect {
    let con = &map[id];
    if header == Header::Bare {
        return con.rect;
    }
    let mut rect = con.rect;
    if header == Header::InRect && con.border_style == BorderStyle::Normal {
        rect = rect.inset(Insets { top: settings.deco_height, ..Insets::default() });
    }
    let bw = settings.border_width;
    let insets = match con.border_style {
        BorderStyle::None => Insets::default(),
        BorderStyle::Pixel => Insets::uniform(bw),
        // The title band takes the place of the top border.
        BorderStyle::Normal => Insets { top: 0, left: bw, bottom: bw, right: bw },
    };
    let rect = rect.inset(insets);
    match &con.window {
        Some(window) => apply_size_hints(rect, &window.hints),
        None => rect,
    }
}

/// Shrinks `rect` to honour an aspect ratio and size increments, centring
/// the result in the space it was given.
pub fn apply_size_hints(rect: Rect, hints: &SizeHints) -> Rect {
    let mut r = rect;
    if hints.aspect_ratio > 0.0 && !r.is_empty() {
        let width_for_height = (f64::from(r.height) * hints.aspect_ratio).round() as i32;
        r = if width_for_height <= r.width {
            r.centered(width_for_height, r.height)
        } else {
            let height_for_width = (f64::from(r.width) / hints.aspect_ratio).round() as i32;
            r.centered(r.width, height_for_width)
        };
    }
    if hints.width_increment > 1 && r.width > hints.base_width {
        let excess = (r.width - hints.base_width) % hints.width_increment;
        r = r.centered(r.width - excess, r.height);
    }
    if hints.height_increment > 1 && r.height > hints.base_height {
        let excess = (r.height - hints.base_height) % hints.height_increment;
        r = r.centered(r.width, r.height - excess);
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sizes_hands_out_rounding_error_from_the_left() {
        assert_eq!(split_sizes(&[0.0, 0.0, 0.0], 100), vec![34, 33, 33]);
        assert_eq!(split_sizes(&[0.0, 0.0, 0.0], 101), vec![33, 34, 34]);
        assert_eq!(split_sizes(&[1.0 / 3.0; 3], 1920), vec![640, 640, 640]);
    }

    #[test]
    fn split_sizes_removes_overshoot() {
        // Both halves of 101 round up to 51.
        assert_eq!(split_sizes(&[0.5, 0.5], 101), vec![50, 51]);
    }

    #[test]
    fn split_sizes_always_fills_total() {
        for total in [0, 1, 7, 99, 1366] {
            for percents in [&[0.2, 0.3, 0.5][..], &[0.1; 10][..], &[1.0][..]] {
                assert_eq!(split_sizes(percents, total).iter().sum::<i32>(), total);
            }
        }
    }

    #[test]
    fn aspect_ratio_centres_horizontally() {
        let hints = SizeHints { aspect_ratio: 1.0, ..SizeHints::default() };
        assert_eq!(apply_size_hints(Rect::new(0, 0, 200, 100), &hints), Rect::new(50, 0, 100, 100));
    }

    #[test]
    fn aspect_ratio_centres_vertically() {
        let hints = SizeHints { aspect_ratio: 2.0, ..SizeHints::default() };
        assert_eq!(apply_size_hints(Rect::new(0, 0, 100, 100), &hints), Rect::new(0, 25, 100, 50));
    }

    #[test]
    fn increments_snap_down_and_centre() {
        let hints = SizeHints {
            width_increment: 10,
            height_increment: 7,
            base_width: 4,
            base_height: 0,
            ..SizeHints::default()
        };
        // 103 - 4 = 99 -> 90 usable, 9 slack; 50 -> 49, 1 slack.
        assert_eq!(apply_size_hints(Rect::new(0, 0, 103, 50), &hints), Rect::new(4, 0, 94, 49));
    }
}
