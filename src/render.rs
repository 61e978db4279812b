//! Render Module — Double-buffered cell grid with diff-based repaint.
//!
//! Responsibilities:
//! - Render the visible layer list into the back buffer (chrome here,
//!   widget content via the gateway's Render capability)
//! - Diff back vs front, emit only changed cells to the backend
//! - Sync front to back in place: at steady state a full render cycle
//!   allocates nothing for cell storage
//! - Surface resize and the full-repaint obligation that follows it

use crate::context::TuiContext;
use crate::gateway::{self, Capability, InvokeArgs};
use crate::types::{Buffer, CellAttrs, CellUpdate};

// ============================================================================
// Render Pipeline
// ============================================================================

/// Execute one full render pass:
/// 1. Pick up backend size changes
/// 2. Compute layout (dirty subtrees only)
/// 3. Clear the back buffer and render the visible layers into it
/// 4. Present: diff back vs front, emit changes, sync front
/// 5. Clear dirty flags
pub fn render(ctx: &mut TuiContext) -> Result<(), String> {
    let start = std::time::Instant::now();

    let (w, h) = ctx.backend.size();
    if ctx.back_buffer.width != w || ctx.back_buffer.height != h {
        resize_surface(ctx, w, h);
    }

    crate::layout::compute_layout(ctx)?;

    ctx.back_buffer.clear();
    for layer in ctx.nav.visible_layers() {
        render_node(ctx, layer, layer);
    }

    present(ctx)?;

    crate::tree::clear_dirty_flags(ctx);
    ctx.needs_render = false;

    ctx.perf_render_us = start.elapsed().as_micros() as u64;
    ctx.debug_log(&format!(
        "render: {}μs, {} cells changed",
        ctx.perf_render_us, ctx.perf_diff_cells
    ));
    Ok(())
}

/// Render one node into the back buffer: background and border here, the
/// node's own content through its Render capability, then children in
/// paint order. A faulting Render is contained by the gateway; the rest of
/// the tree still paints.
fn render_node(ctx: &mut TuiContext, handle: u32, screen: u32) {
    let (visible, bounds, bg, border, border_fg) = match ctx.nodes.get(&handle) {
        Some(node) => (
            node.visible,
            node.bounds,
            node.visual_style.bg,
            node.visual_style.border,
            if node.visual_style.border_color != 0 {
                node.visual_style.border_color
            } else {
                node.visual_style.fg
            },
        ),
        None => return,
    };
    if !visible {
        return;
    }

    if bg != 0 {
        for row in 0..bounds.height {
            for col in 0..bounds.width {
                put_clipped(
                    &mut ctx.back_buffer,
                    bounds.x + col,
                    bounds.y + row,
                    ' ',
                    0,
                    bg,
                    CellAttrs::empty(),
                );
            }
        }
    }

    if let Some(chars) = border.chars() {
        draw_border(&mut ctx.back_buffer, bounds, chars, border_fg, bg);
    }

    gateway::invoke(
        ctx,
        handle,
        Capability::Render,
        InvokeArgs {
            screen: Some(screen),
            ..InvokeArgs::default()
        },
    );

    for child in crate::tree::paint_order(ctx, handle) {
        render_node(ctx, child, screen);
    }
}

/// Clip-checked put for signed coordinates; the buffer clips the far edge.
fn put_clipped(buf: &mut Buffer, x: i32, y: i32, ch: char, fg: u32, bg: u32, attrs: CellAttrs) {
    if x >= 0 && y >= 0 && x <= u16::MAX as i32 && y <= u16::MAX as i32 {
        buf.put(x as u16, y as u16, ch, fg, bg, attrs);
    }
}

fn draw_border(
    buf: &mut Buffer,
    bounds: crate::layout::Rect,
    chars: (char, char, char, char, char, char),
    fg: u32,
    bg: u32,
) {
    let (tl, tr, bl, br, horiz, vert) = chars;
    let attrs = CellAttrs::empty();
    let (x, y, w, h) = (bounds.x, bounds.y, bounds.width, bounds.height);
    if w <= 0 || h <= 0 {
        return;
    }

    put_clipped(buf, x, y, tl, fg, bg, attrs);
    if w > 1 {
        put_clipped(buf, x + w - 1, y, tr, fg, bg, attrs);
    }
    if h > 1 {
        put_clipped(buf, x, y + h - 1, bl, fg, bg, attrs);
    }
    if w > 1 && h > 1 {
        put_clipped(buf, x + w - 1, y + h - 1, br, fg, bg, attrs);
    }

    for col in 1..(w - 1) {
        put_clipped(buf, x + col, y, horiz, fg, bg, attrs);
        if h > 1 {
            put_clipped(buf, x + col, y + h - 1, horiz, fg, bg, attrs);
        }
    }
    for row in 1..(h - 1) {
        put_clipped(buf, x, y + row, vert, fg, bg, attrs);
        if w > 1 {
            put_clipped(buf, x + w - 1, y + row, vert, fg, bg, attrs);
        }
    }
}

// ============================================================================
// Present
// ============================================================================

/// Diff the back buffer against the front, emit exactly the changed cells
/// to the backend, then overwrite the front cells' fields in place from
/// the back. After a resize the diff is bypassed once and every cell is
/// emitted, since the front no longer reflects any real output.
pub fn present(ctx: &mut TuiContext) -> Result<(), String> {
    let mut updates = std::mem::take(&mut ctx.diff_scratch);
    updates.clear();

    let width = ctx.back_buffer.width as usize;
    let len = ctx.back_buffer.cells.len();
    for i in 0..len {
        let back = &ctx.back_buffer.cells[i];
        if ctx.full_repaint || *back != ctx.front_buffer.cells[i] {
            updates.push(CellUpdate {
                x: (i % width.max(1)) as u16,
                y: (i / width.max(1)) as u16,
                cell: *back,
            });
        }
    }

    ctx.perf_diff_cells = updates.len() as u32;
    ctx.backend.write_diff(&updates)?;
    ctx.backend.flush()?;

    for i in 0..len {
        let back = ctx.back_buffer.cells[i];
        ctx.front_buffer.cells[i].assign_from(&back);
    }

    ctx.full_repaint = false;
    ctx.diff_scratch = updates;
    Ok(())
}

// ============================================================================
// Resize
// ============================================================================

/// Replace both buffers atomically at the new dimensions and arm the
/// full-repaint flag. Every node goes dirty: bounds derived from the old
/// surface are stale.
pub fn resize_surface(ctx: &mut TuiContext, width: u16, height: u16) {
    if ctx.back_buffer.width == width && ctx.back_buffer.height == height {
        return;
    }
    ctx.front_buffer.resize(width, height);
    ctx.back_buffer.resize(width, height);
    ctx.full_repaint = true;
    for node in ctx.nodes.values_mut() {
        node.dirty = true;
    }
    ctx.debug_log(&format!("resize_surface: {width}x{height}"));
}
