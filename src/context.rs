//! TuiContext — the single explicit context object.
//!
//! The context owns all mutable UI state: the node arena, both cell
//! buffers, the backend, the input queue, navigation state, and the
//! diagnostics log. There is no global instance; every entry point in the
//! crate takes the context explicitly, which is also what keeps the
//! single-writer concurrency rule checkable at the type level. One main
//! loop thread owns the context; producers reach it only through the
//! background hand-off channel.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use crate::gateway::Diagnostic;
use crate::router::NavigationState;
use crate::terminal::TerminalBackend;
use crate::tree::Node;
use crate::types::{Buffer, CellUpdate, InputEvent};

// ============================================================================
// Background Hand-off
// ============================================================================

/// A completed background task's result: an ordinary state mutation the
/// main loop applies at its drain point, plus the node whose subtree gets
/// marked dirty afterwards.
pub struct BackgroundResult {
    pub target: u32,
    pub apply: Box<dyn FnOnce(&mut TuiContext) + Send>,
}

/// Cooperative cancellation for a background task. The owner flips the
/// flag; the task checks it and exits. The main loop never interrupts.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

// ============================================================================
// TuiContext
// ============================================================================

pub struct TuiContext {
    // Tree Module
    pub nodes: HashMap<u32, Node>,
    pub next_handle: u32,

    // Event Module
    pub event_queue: VecDeque<InputEvent>,
    pub focused: Option<u32>,

    // Render Module
    pub front_buffer: Buffer,
    pub back_buffer: Buffer,
    pub backend: Box<dyn TerminalBackend>,
    /// Reused diff list; cleared, never shrunk, between frames.
    pub diff_scratch: Vec<CellUpdate>,
    /// A contained fault or explicit request asked for a repaint even if no
    /// node is dirty.
    pub needs_render: bool,
    /// Set by resize: the front buffer no longer reflects real output, so
    /// the next present bypasses diffing.
    pub full_repaint: bool,

    // Navigation Module
    pub nav: NavigationState,

    // Background hand-off
    background_tx: Sender<BackgroundResult>,
    background_rx: Receiver<BackgroundResult>,

    // Diagnostics
    pub diagnostics: Vec<Diagnostic>,
    pub debug_mode: bool,
    pub quit: bool,
    pub perf_layout_us: u64,
    pub perf_render_us: u64,
    pub perf_diff_cells: u32,
}

impl TuiContext {
    pub fn new(backend: Box<dyn TerminalBackend>) -> Self {
        let (w, h) = backend.size();
        let (background_tx, background_rx) = channel();
        Self {
            nodes: HashMap::new(),
            next_handle: 1, // handle 0 is permanently invalid

            event_queue: VecDeque::new(),
            focused: None,

            front_buffer: Buffer::new(w, h),
            back_buffer: Buffer::new(w, h),
            backend,
            diff_scratch: Vec::new(),
            needs_render: false,
            full_repaint: true,

            nav: NavigationState::new(),

            background_tx,
            background_rx,

            diagnostics: Vec::new(),
            debug_mode: false,
            quit: false,
            perf_layout_us: 0,
            perf_render_us: 0,
            perf_diff_cells: 0,
        }
    }

    /// Validate that a handle refers to an existing node.
    pub fn validate_node(&self, handle: u32) -> Result<(), String> {
        if handle == 0 {
            return Err("Handle 0 is the invalid sentinel".to_string());
        }
        if !self.nodes.contains_key(&handle) {
            return Err(format!("Invalid node: {handle}"));
        }
        Ok(())
    }

    /// Sender half of the background hand-off. Clone it into any producer
    /// thread; results land at the main loop's drain point.
    pub fn background_sender(&self) -> Sender<BackgroundResult> {
        self.background_tx.clone()
    }

    /// Drain one pending background result, if any. The runtime calls this
    /// in a loop at its defined drain point each iteration.
    pub(crate) fn try_recv_background(&mut self) -> Option<BackgroundResult> {
        self.background_rx.try_recv().ok()
    }

    pub fn debug_log(&self, msg: &str) {
        if self.debug_mode {
            eprintln!("[helm-tui] {msg}");
        }
    }
}
