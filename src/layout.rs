//! Layout Module — Stack and grid constraint resolution.
//!
//! Responsibilities:
//! - Resolve each panel's children bounds from the panel's content bounds
//! - Stack strategy: sequential main-axis placement with spacing
//! - Grid strategy: fixed/star track sizing with exact remainder handling
//! - Recompute only dirty subtrees
//! - Provide hit-test geometry for mouse events
//!
//! The arrange step reads a child's own size for non-stretch alignments, so
//! a future measure pass can feed desired sizes in without changing call
//! sites; node bounds stay mutable for the same reason.

use crate::context::TuiContext;

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned rectangle in absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

// ============================================================================
// Strategy & Hints
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Stretch,
    Start,
    Center,
    End,
}

/// One grid track definition: an absolute cell count or a proportional
/// star weight. Unspecified weights default to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackSize {
    Fixed(u16),
    Star(f32),
}

impl TrackSize {
    /// `1*` — a unit-weight proportional track.
    pub const STAR: TrackSize = TrackSize::Star(1.0);
}

/// How a panel distributes its content bounds among children.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutStrategy {
    /// Children placed sequentially along `axis`, `spacing` cells apart.
    /// `align` governs the cross axis: Stretch fills the content extent,
    /// the others keep the child's own size and offset it.
    Stack {
        axis: Axis,
        spacing: u16,
        align: Alignment,
    },
    /// Row/column tracks; children pick a cell via their layout props.
    Grid {
        rows: Vec<TrackSize>,
        cols: Vec<TrackSize>,
    },
}

impl LayoutStrategy {
    pub fn vertical_stack(spacing: u16) -> Self {
        Self::Stack {
            axis: Axis::Vertical,
            spacing,
            align: Alignment::Stretch,
        }
    }

    pub fn horizontal_stack(spacing: u16) -> Self {
        Self::Stack {
            axis: Axis::Horizontal,
            spacing,
            align: Alignment::Stretch,
        }
    }

    pub fn grid(rows: Vec<TrackSize>, cols: Vec<TrackSize>) -> Self {
        Self::Grid { rows, cols }
    }
}

/// Hints a parent panel reads when placing a child. Opaque to the child;
/// only the panel's strategy interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutProps {
    pub row: u16,
    pub col: u16,
    pub h_align: Alignment,
    pub v_align: Alignment,
}

// ============================================================================
// Track Resolution
// ============================================================================

/// Resolve track definitions against a total extent. Returns (offset, size)
/// per track, offsets being prefix sums.
///
/// Fixed tracks always receive their declared size verbatim. Star tracks
/// divide whatever remains (floored at zero) by weight, with integer floor
/// division per track; the rounding leftover goes entirely to the last star
/// track so star-distributed space is exact. An empty definition list is
/// treated as a single unit star track.
pub fn resolve_tracks(defs: &[TrackSize], total: u16) -> Vec<(u16, u16)> {
    if defs.is_empty() {
        return vec![(0, total)];
    }

    let fixed_sum: u32 = defs
        .iter()
        .map(|d| match d {
            TrackSize::Fixed(n) => *n as u32,
            TrackSize::Star(_) => 0,
        })
        .sum();
    let remaining = (total as u32).saturating_sub(fixed_sum);

    // Negative and NaN weights cannot resolve to a size; clamp to zero.
    let weight_of = |d: &TrackSize| -> f64 {
        match d {
            TrackSize::Fixed(_) => 0.0,
            TrackSize::Star(w) => {
                if w.is_finite() && *w > 0.0 {
                    *w as f64
                } else {
                    0.0
                }
            }
        }
    };
    let weight_sum: f64 = defs.iter().map(weight_of).sum();
    let last_star = defs
        .iter()
        .rposition(|d| matches!(d, TrackSize::Star(_)));

    let mut sizes = Vec::with_capacity(defs.len());
    let mut star_assigned: u32 = 0;
    for (i, def) in defs.iter().enumerate() {
        let size = match def {
            TrackSize::Fixed(n) => *n as u32,
            TrackSize::Star(_) => {
                if Some(i) == last_star {
                    // Remainder sink: whatever floor division left over.
                    remaining - star_assigned
                } else if weight_sum > 0.0 {
                    let share =
                        ((remaining as f64) * weight_of(def) / weight_sum).floor() as u32;
                    star_assigned += share;
                    share
                } else {
                    0
                }
            }
        };
        sizes.push(size.min(u16::MAX as u32) as u16);
    }

    let mut offset: u16 = 0;
    sizes
        .into_iter()
        .map(|size| {
            let entry = (offset, size);
            offset = offset.saturating_add(size);
            entry
        })
        .collect()
}

/// Align an extent within a track span. Stretch fills the span; the others
/// keep `own` (clamped to the span) and offset it.
fn align_extent(align: Alignment, span_offset: i32, span_size: i32, own: i32) -> (i32, i32) {
    match align {
        Alignment::Stretch => (span_offset, span_size),
        Alignment::Start => (span_offset, own.min(span_size)),
        Alignment::Center => {
            let size = own.min(span_size);
            (span_offset + (span_size - size) / 2, size)
        }
        Alignment::End => {
            let size = own.min(span_size);
            (span_offset + span_size - size, size)
        }
    }
}

// ============================================================================
// Arrange
// ============================================================================

/// Recompute bounds for all dirty subtrees, starting from the given roots
/// (the router's mounted screens). Clean subtrees are skipped wholesale.
pub fn compute_layout(ctx: &mut TuiContext) -> Result<(), String> {
    let roots = ctx.nav.mounted_roots();
    if roots.is_empty() {
        return Ok(());
    }

    let start = std::time::Instant::now();

    let (w, h) = (ctx.back_buffer.width, ctx.back_buffer.height);
    let surface = Rect::new(0, 0, w as i32, h as i32);
    for root in roots {
        if let Some(node) = ctx.nodes.get_mut(&root) {
            if node.bounds != surface {
                node.bounds = surface;
                node.dirty = true;
            }
        }
        arrange_subtree(ctx, root, false);
    }

    ctx.perf_layout_us = start.elapsed().as_micros() as u64;
    ctx.debug_log(&format!("compute_layout: {}μs", ctx.perf_layout_us));
    Ok(())
}

/// Arrange a node's children if it (or an ancestor being re-arranged) is
/// dirty, then descend. `forced` carries the ancestor-dirty signal down.
fn arrange_subtree(ctx: &mut TuiContext, handle: u32, forced: bool) {
    let (dirty, children) = match ctx.nodes.get(&handle) {
        Some(node) => (node.dirty, node.children.clone()),
        None => return,
    };
    let arrange = forced || dirty;

    if arrange {
        arrange_children(ctx, handle);
    }
    for child in children {
        arrange_subtree(ctx, child, arrange);
    }
}

/// Apply the panel's strategy to assign each child's bounds from the
/// panel's content bounds. Nodes without a strategy leave children where
/// they are (their bounds were set by hand or by a widget constructor).
fn arrange_children(ctx: &mut TuiContext, handle: u32) {
    let (content, strategy, children) = match ctx.nodes.get(&handle) {
        Some(node) => match &node.layout {
            Some(strategy) => (
                node.visual_style.content_bounds(node.bounds),
                strategy.clone(),
                node.children.clone(),
            ),
            None => return,
        },
        None => return,
    };

    match strategy {
        LayoutStrategy::Stack {
            axis,
            spacing,
            align,
        } => arrange_stack(ctx, content, axis, spacing, align, &children),
        LayoutStrategy::Grid { rows, cols } => arrange_grid(ctx, content, &rows, &cols, &children),
    }
}

fn arrange_stack(
    ctx: &mut TuiContext,
    content: Rect,
    axis: Axis,
    spacing: u16,
    align: Alignment,
    children: &[u32],
) {
    let mut main = match axis {
        Axis::Horizontal => content.x,
        Axis::Vertical => content.y,
    };

    for &child in children {
        let Some(node) = ctx.nodes.get_mut(&child) else {
            continue;
        };
        // Hidden children consume no space and shift nothing after them.
        if !node.visible {
            continue;
        }

        let own_w = node.bounds.width;
        let own_h = node.bounds.height;
        match axis {
            Axis::Horizontal => {
                let (y, h) = align_extent(align, content.y, content.height, own_h);
                node.bounds = Rect::new(main, y, own_w, h);
                main += own_w + spacing as i32;
            }
            Axis::Vertical => {
                let (x, w) = align_extent(align, content.x, content.width, own_w);
                node.bounds = Rect::new(x, main, w, own_h);
                main += own_h + spacing as i32;
            }
        }
    }
}

fn arrange_grid(
    ctx: &mut TuiContext,
    content: Rect,
    rows: &[TrackSize],
    cols: &[TrackSize],
    children: &[u32],
) {
    let row_tracks = resolve_tracks(rows, content.height.max(0) as u16);
    let col_tracks = resolve_tracks(cols, content.width.max(0) as u16);

    for &child in children {
        let Some(node) = ctx.nodes.get_mut(&child) else {
            continue;
        };
        if !node.visible {
            continue;
        }

        // Out-of-range indices clamp into the valid track range.
        let row = (node.layout_props.row as usize).min(row_tracks.len() - 1);
        let col = (node.layout_props.col as usize).min(col_tracks.len() - 1);
        let (row_off, row_size) = row_tracks[row];
        let (col_off, col_size) = col_tracks[col];

        let (x, w) = align_extent(
            node.layout_props.h_align,
            content.x + col_off as i32,
            col_size as i32,
            node.bounds.width,
        );
        let (y, h) = align_extent(
            node.layout_props.v_align,
            content.y + row_off as i32,
            row_size as i32,
            node.bounds.height,
        );
        node.bounds = Rect::new(x, y, w, h);
    }
}

// ============================================================================
// Setters
// ============================================================================

/// Assign a layout strategy to a panel.
pub fn set_layout(
    ctx: &mut TuiContext,
    handle: u32,
    strategy: LayoutStrategy,
) -> Result<(), String> {
    let node = ctx
        .nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?;
    if !node.kind.is_panel() {
        return Err(format!("Node {handle} is not a panel"));
    }
    node.layout = Some(strategy);
    crate::tree::mark_dirty(ctx, handle);
    Ok(())
}

/// Attach layout hints to a child for its parent panel to read.
pub fn set_layout_props(
    ctx: &mut TuiContext,
    handle: u32,
    props: LayoutProps,
) -> Result<(), String> {
    let node = ctx
        .nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?;
    node.layout_props = props;
    let dirty_target = node.parent.unwrap_or(handle);
    crate::tree::mark_dirty(ctx, dirty_target);
    Ok(())
}

/// Set a node's size directly. The position half of the bounds belongs to
/// the parent's arrange step.
pub fn set_size(ctx: &mut TuiContext, handle: u32, width: i32, height: i32) -> Result<(), String> {
    let node = ctx
        .nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?;
    node.bounds.width = width.max(0);
    node.bounds.height = height.max(0);
    crate::tree::mark_dirty(ctx, handle);
    Ok(())
}

// ============================================================================
// Hit Testing
// ============================================================================

/// Find the deepest visible node containing the given screen coordinate.
/// Children are tested in reverse paint order, so higher z wins.
pub fn hit_test(ctx: &TuiContext, x: u16, y: u16) -> Option<u32> {
    let root = ctx.nav.active_screen()?;
    hit_test_recursive(ctx, root, x as i32, y as i32)
}

fn hit_test_recursive(ctx: &TuiContext, handle: u32, x: i32, y: i32) -> Option<u32> {
    let node = ctx.nodes.get(&handle)?;
    if !node.visible || !node.bounds.contains(x, y) {
        return None;
    }

    for &child in crate::tree::paint_order(ctx, handle).iter().rev() {
        if let Some(hit) = hit_test_recursive(ctx, child, x, y) {
            return Some(hit);
        }
    }

    Some(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TuiContext;
    use crate::terminal::MockBackend;
    use crate::tree;
    use crate::types::NodeKind;

    fn test_ctx() -> TuiContext {
        TuiContext::new(Box::new(MockBackend::new(80, 24)))
    }

    fn panel_with_children(ctx: &mut TuiContext, n: usize) -> (u32, Vec<u32>) {
        let panel = tree::create_node(ctx, NodeKind::Panel).unwrap();
        let children = (0..n)
            .map(|_| {
                let c = tree::create_node(ctx, NodeKind::Label).unwrap();
                tree::append_child(ctx, panel, c).unwrap();
                c
            })
            .collect();
        (panel, children)
    }

    // --- Track resolution ---

    #[test]
    fn test_tracks_fixed_only() {
        let tracks = resolve_tracks(&[TrackSize::Fixed(3), TrackSize::Fixed(5)], 20);
        assert_eq!(tracks, vec![(0, 3), (3, 5)]);
    }

    #[test]
    fn test_tracks_star_split_with_remainder_to_last() {
        // 1* and 2* over 12 → 4 and 8
        let tracks = resolve_tracks(&[TrackSize::Star(1.0), TrackSize::Star(2.0)], 12);
        assert_eq!(tracks, vec![(0, 4), (4, 8)]);

        // 1*,1*,1* over 10 → 3,3,4 (leftover cell lands on the last star)
        let tracks = resolve_tracks(&[TrackSize::STAR, TrackSize::STAR, TrackSize::STAR], 10);
        assert_eq!(tracks, vec![(0, 3), (3, 3), (6, 4)]);
        let total: u16 = tracks.iter().map(|(_, s)| s).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_tracks_fixed_and_star_sum_to_extent() {
        let tracks = resolve_tracks(
            &[TrackSize::Fixed(4), TrackSize::Star(1.5), TrackSize::Star(0.5)],
            24,
        );
        let total: u16 = tracks.iter().map(|(_, s)| s).sum();
        assert_eq!(total, 24);
        assert_eq!(tracks[0].1, 4);
        // 20 remaining: floor(20*1.5/2)=15, last star takes the rest (5)
        assert_eq!(tracks[1].1, 15);
        assert_eq!(tracks[2].1, 5);
    }

    #[test]
    fn test_tracks_fixed_verbatim_at_zero_extent() {
        let tracks = resolve_tracks(&[TrackSize::Fixed(6), TrackSize::STAR], 0);
        assert_eq!(tracks, vec![(0, 6), (6, 0)]);
    }

    #[test]
    fn test_tracks_fixed_overflow_stars_zero() {
        // Fixed takes its declared size even past the extent; stars floor at 0.
        let tracks = resolve_tracks(&[TrackSize::Fixed(10), TrackSize::STAR], 8);
        assert_eq!(tracks, vec![(0, 10), (10, 0)]);
    }

    #[test]
    fn test_tracks_empty_defs_single_star() {
        assert_eq!(resolve_tracks(&[], 17), vec![(0, 17)]);
    }

    #[test]
    fn test_tracks_zero_weight_star() {
        let tracks = resolve_tracks(&[TrackSize::Star(0.0), TrackSize::STAR], 9);
        assert_eq!(tracks, vec![(0, 0), (0, 9)]);
    }

    // --- Stack ---

    #[test]
    fn test_stack_vertical_accumulates_with_spacing() {
        let mut ctx = test_ctx();
        let (panel, kids) = panel_with_children(&mut ctx, 3);
        set_layout(
            &mut ctx,
            panel,
            LayoutStrategy::Stack {
                axis: Axis::Vertical,
                spacing: 1,
                align: Alignment::Stretch,
            },
        )
        .unwrap();
        ctx.nodes.get_mut(&panel).unwrap().bounds = Rect::new(0, 0, 40, 20);
        for &k in &kids {
            set_size(&mut ctx, k, 10, 2).unwrap();
        }

        arrange_children(&mut ctx, panel);

        assert_eq!(ctx.nodes[&kids[0]].bounds, Rect::new(0, 0, 40, 2));
        assert_eq!(ctx.nodes[&kids[1]].bounds, Rect::new(0, 3, 40, 2));
        assert_eq!(ctx.nodes[&kids[2]].bounds, Rect::new(0, 6, 40, 2));
        // Total consumed: 3 children * 2 + 2 gaps * 1 = 8
        let last = ctx.nodes[&kids[2]].bounds;
        assert_eq!(last.y + last.height, 8);
    }

    #[test]
    fn test_stack_hidden_child_consumes_no_space() {
        let mut ctx = test_ctx();
        let (panel, kids) = panel_with_children(&mut ctx, 3);
        set_layout(&mut ctx, panel, LayoutStrategy::vertical_stack(1)).unwrap();
        ctx.nodes.get_mut(&panel).unwrap().bounds = Rect::new(0, 0, 40, 20);
        for &k in &kids {
            set_size(&mut ctx, k, 10, 2).unwrap();
        }
        ctx.nodes.get_mut(&kids[1]).unwrap().visible = false;

        arrange_children(&mut ctx, panel);

        assert_eq!(ctx.nodes[&kids[0]].bounds.y, 0);
        // Third child lands where the second would have
        assert_eq!(ctx.nodes[&kids[2]].bounds.y, 3);
    }

    #[test]
    fn test_stack_cross_axis_alignment() {
        let mut ctx = test_ctx();
        let (panel, kids) = panel_with_children(&mut ctx, 1);
        set_layout(
            &mut ctx,
            panel,
            LayoutStrategy::Stack {
                axis: Axis::Vertical,
                spacing: 0,
                align: Alignment::Center,
            },
        )
        .unwrap();
        ctx.nodes.get_mut(&panel).unwrap().bounds = Rect::new(0, 0, 40, 20);
        set_size(&mut ctx, kids[0], 10, 2).unwrap();

        arrange_children(&mut ctx, panel);

        // Centered in 40 wide: offset (40-10)/2 = 15, keeps its own width
        assert_eq!(ctx.nodes[&kids[0]].bounds, Rect::new(15, 0, 10, 2));
    }

    #[test]
    fn test_stack_horizontal_respects_border_inset() {
        let mut ctx = test_ctx();
        let (panel, kids) = panel_with_children(&mut ctx, 2);
        set_layout(&mut ctx, panel, LayoutStrategy::horizontal_stack(2)).unwrap();
        crate::style::set_border(&mut ctx, panel, crate::types::BorderStyle::Single).unwrap();
        ctx.nodes.get_mut(&panel).unwrap().bounds = Rect::new(0, 0, 20, 10);
        for &k in &kids {
            set_size(&mut ctx, k, 4, 3).unwrap();
        }

        arrange_children(&mut ctx, panel);

        // Content starts inside the border at (1,1)
        assert_eq!(ctx.nodes[&kids[0]].bounds.x, 1);
        assert_eq!(ctx.nodes[&kids[0]].bounds.y, 1);
        assert_eq!(ctx.nodes[&kids[1]].bounds.x, 7); // 1 + 4 + 2
    }

    // --- Grid ---

    #[test]
    fn test_grid_places_children_by_props() {
        let mut ctx = test_ctx();
        let (panel, kids) = panel_with_children(&mut ctx, 2);
        set_layout(
            &mut ctx,
            panel,
            LayoutStrategy::grid(
                vec![TrackSize::STAR],
                vec![TrackSize::Star(1.0), TrackSize::Star(2.0)],
            ),
        )
        .unwrap();
        ctx.nodes.get_mut(&panel).unwrap().bounds = Rect::new(0, 0, 12, 4);
        set_layout_props(
            &mut ctx,
            kids[1],
            LayoutProps {
                col: 1,
                ..LayoutProps::default()
            },
        )
        .unwrap();

        arrange_children(&mut ctx, panel);

        assert_eq!(ctx.nodes[&kids[0]].bounds, Rect::new(0, 0, 4, 4));
        assert_eq!(ctx.nodes[&kids[1]].bounds, Rect::new(4, 0, 8, 4));
    }

    #[test]
    fn test_grid_clamps_out_of_range_indices() {
        let mut ctx = test_ctx();
        let (panel, kids) = panel_with_children(&mut ctx, 1);
        set_layout(
            &mut ctx,
            panel,
            LayoutStrategy::grid(vec![TrackSize::STAR], vec![TrackSize::STAR, TrackSize::STAR]),
        )
        .unwrap();
        ctx.nodes.get_mut(&panel).unwrap().bounds = Rect::new(0, 0, 10, 4);
        set_layout_props(
            &mut ctx,
            kids[0],
            LayoutProps {
                row: 9,
                col: 9,
                ..LayoutProps::default()
            },
        )
        .unwrap();

        arrange_children(&mut ctx, panel);

        // Clamped into the last column track
        assert_eq!(ctx.nodes[&kids[0]].bounds, Rect::new(5, 0, 5, 4));
    }

    #[test]
    fn test_grid_cell_alignment() {
        let mut ctx = test_ctx();
        let (panel, kids) = panel_with_children(&mut ctx, 1);
        set_layout(
            &mut ctx,
            panel,
            LayoutStrategy::grid(vec![TrackSize::STAR], vec![TrackSize::STAR]),
        )
        .unwrap();
        ctx.nodes.get_mut(&panel).unwrap().bounds = Rect::new(0, 0, 20, 10);
        set_size(&mut ctx, kids[0], 6, 2).unwrap();
        set_layout_props(
            &mut ctx,
            kids[0],
            LayoutProps {
                h_align: Alignment::End,
                v_align: Alignment::Start,
                ..LayoutProps::default()
            },
        )
        .unwrap();

        arrange_children(&mut ctx, panel);

        assert_eq!(ctx.nodes[&kids[0]].bounds, Rect::new(14, 0, 6, 2));
    }

    // --- Dirty-driven recompute ---

    #[test]
    fn test_clean_subtree_skips_arrange() {
        let mut ctx = test_ctx();
        let (panel, kids) = panel_with_children(&mut ctx, 1);
        set_layout(&mut ctx, panel, LayoutStrategy::vertical_stack(0)).unwrap();
        set_size(&mut ctx, kids[0], 5, 1).unwrap();
        ctx.nav.mount_for_test(panel);

        compute_layout(&mut ctx).unwrap();
        crate::tree::clear_dirty_flags(&mut ctx);

        // Clean tree: a hand-moved child stays put because nothing forces
        // an arrange.
        ctx.nodes.get_mut(&kids[0]).unwrap().bounds.x = 7;
        compute_layout(&mut ctx).unwrap();
        assert_eq!(ctx.nodes[&kids[0]].bounds.x, 7);

        // Dirty panel: arrange snaps the child back.
        crate::tree::mark_dirty(&mut ctx, panel);
        compute_layout(&mut ctx).unwrap();
        assert_eq!(ctx.nodes[&kids[0]].bounds.x, 0);
    }
}
