//! Runtime Module — the cooperative main loop.
//!
//! One thread owns the context and runs frames to completion; nothing in a
//! frame suspends. Input producers and background tasks only enqueue; the
//! loop drains both at fixed points each iteration, so all state mutation
//! stays on this thread. Frame shape:
//!
//! 1. Read input into the queue
//! 2. Dispatch queued events through the gateway (focused node first,
//!    bubbling up the parent chain until consumed)
//! 3. Drain completed background results, apply, mark dirty
//! 4. Layout + render + present, only if something is dirty

use crate::context::TuiContext;
use crate::gateway::{self, Capability, InvokeArgs, Reply};
use crate::types::InputEvent;

/// Default input poll timeout per frame, in milliseconds.
pub const FRAME_POLL_MS: u32 = 16;

/// Run frames until quit is requested. Initializes and shuts down the
/// backend around the loop; startup failures are fatal, per-frame faults
/// inside UI content are not.
pub fn run(ctx: &mut TuiContext) -> Result<(), String> {
    ctx.backend.init()?;
    let result = run_loop(ctx);
    // Restore the terminal even when the loop errored.
    let shutdown = ctx.backend.shutdown();
    result.and(shutdown)
}

fn run_loop(ctx: &mut TuiContext) -> Result<(), String> {
    while !ctx.quit {
        run_frame(ctx, FRAME_POLL_MS)?;
    }
    Ok(())
}

/// One loop iteration. Public so tests and embedding hosts can drive the
/// loop themselves.
pub fn run_frame(ctx: &mut TuiContext, poll_ms: u32) -> Result<(), String> {
    crate::event::read_input(ctx, poll_ms);
    while let Some(event) = crate::event::next_event(ctx) {
        dispatch_input(ctx, &event);
    }

    drain_background(ctx);

    if crate::tree::any_dirty(ctx) || ctx.needs_render || ctx.full_repaint {
        crate::render::render(ctx)?;
    }
    Ok(())
}

/// Ask the loop to exit after the current frame.
pub fn request_quit(ctx: &mut TuiContext) {
    ctx.quit = true;
}

/// Route one event into the tree. Mouse events start at the hit-tested
/// node, keys at the focused node, anything else at the active screen
/// root; unconsumed events bubble up the parent chain.
fn dispatch_input(ctx: &mut TuiContext, event: &InputEvent) {
    let Some(screen) = ctx.nav.active_screen() else {
        return;
    };

    let mut target = match event {
        InputEvent::Mouse { x, y, .. } => crate::layout::hit_test(ctx, *x, *y).unwrap_or(screen),
        InputEvent::Key { .. } => ctx.focused.unwrap_or(screen),
        _ => screen,
    };

    loop {
        let reply = gateway::invoke(
            ctx,
            target,
            Capability::HandleInput,
            InvokeArgs {
                screen: Some(screen),
                event: Some(event),
                ..InvokeArgs::default()
            },
        );
        if reply == Reply::Consumed {
            return;
        }
        match ctx.nodes.get(&target).and_then(|n| n.parent) {
            Some(parent) => target = parent,
            None => return,
        }
    }
}

/// Apply completed background results. Each is an ordinary state mutation
/// followed by a dirty mark on the affected subtree.
fn drain_background(ctx: &mut TuiContext) {
    while let Some(result) = ctx.try_recv_background() {
        (result.apply)(ctx);
        crate::tree::mark_dirty(ctx, result.target);
        ctx.debug_log(&format!("background result applied: node {}", result.target));
    }
}
