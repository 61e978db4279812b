//! Event Module — Input capture, focus state machine, poll-drain queue.
//!
//! Responsibilities:
//! - Read terminal input via TerminalBackend and buffer it (producers only
//!   enqueue; consumption happens on the main loop thread)
//! - Focus traversal over the active screen (Tab / BackTab, depth-first)
//! - Hit-testing mouse events to focusable targets
//! - Routing resize notifications to the surface

use crate::context::TuiContext;
use crate::types::{key, InputEvent};

/// Read terminal input and buffer it for the drain loop. Returns the
/// number of events captured. Focus traversal and resize are handled here;
/// everything else waits in the queue for capability dispatch.
pub fn read_input(ctx: &mut TuiContext, timeout_ms: u32) -> usize {
    let raw_events = ctx.backend.read_events(timeout_ms);
    let mut count = 0;

    for event in raw_events {
        match event {
            InputEvent::Key { code, .. } if code == key::TAB => {
                focus_next(ctx);
            }
            InputEvent::Key { code, .. } if code == key::BACK_TAB => {
                focus_prev(ctx);
            }
            InputEvent::Mouse { x, y, button, .. } => {
                // Click events can change focus before dispatch sees them.
                if button <= 2 {
                    if let Some(target) = crate::layout::hit_test(ctx, x, y) {
                        focus_on(ctx, target);
                    }
                }
                ctx.event_queue.push_back(event);
                count += 1;
            }
            InputEvent::Resize { width, height } => {
                crate::render::resize_surface(ctx, width, height);
                ctx.event_queue.push_back(event);
                count += 1;
            }
            _ => {
                ctx.event_queue.push_back(event);
                count += 1;
            }
        }
    }

    count
}

/// Pop the oldest buffered event.
pub fn next_event(ctx: &mut TuiContext) -> Option<InputEvent> {
    ctx.event_queue.pop_front()
}

// ============================================================================
// Focus
// ============================================================================

/// Focus a node if it is focusable; emits a FocusChange by marking both
/// ends dirty so focus affordances repaint.
pub fn focus_on(ctx: &mut TuiContext, target: u32) {
    let focusable = ctx
        .nodes
        .get(&target)
        .map(|n| n.focusable && n.visible)
        .unwrap_or(false);
    if !focusable || ctx.focused == Some(target) {
        return;
    }
    if let Some(old) = ctx.focused {
        crate::tree::mark_dirty(ctx, old);
    }
    ctx.focused = Some(target);
    crate::tree::mark_dirty(ctx, target);
    ctx.debug_log(&format!("focus_on: {target}"));
}

/// Advance focus to the next focusable node of the active screen,
/// wrapping. With no current focus, the first focusable wins.
pub fn focus_next(ctx: &mut TuiContext) {
    shift_focus(ctx, 1);
}

/// Move focus to the previous focusable node, wrapping.
pub fn focus_prev(ctx: &mut TuiContext) {
    shift_focus(ctx, -1);
}

fn shift_focus(ctx: &mut TuiContext, direction: isize) {
    let ring = collect_focusable(ctx);
    if ring.is_empty() {
        return;
    }

    let next = match ctx.focused.and_then(|f| ring.iter().position(|&h| h == f)) {
        Some(current) => {
            let len = ring.len() as isize;
            let idx = (current as isize + direction).rem_euclid(len);
            ring[idx as usize]
        }
        None => {
            if direction >= 0 {
                ring[0]
            } else {
                ring[ring.len() - 1]
            }
        }
    };
    focus_on(ctx, next);
}

/// Focusable, visible nodes of the active screen in depth-first paint
/// order — the focus ring.
fn collect_focusable(ctx: &TuiContext) -> Vec<u32> {
    let mut ring = Vec::new();
    if let Some(root) = ctx.nav.active_screen() {
        collect_focusable_recursive(ctx, root, &mut ring);
    }
    ring
}

fn collect_focusable_recursive(ctx: &TuiContext, handle: u32, ring: &mut Vec<u32>) {
    let Some(node) = ctx.nodes.get(&handle) else {
        return;
    };
    if !node.visible {
        return;
    }
    if node.focusable {
        ring.push(handle);
    }
    for child in crate::tree::paint_order(ctx, handle) {
        collect_focusable_recursive(ctx, child, ring);
    }
}
