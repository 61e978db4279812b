//! Helm TUI — a terminal dashboard framework.
//!
//! A component tree of panels and capability-bearing widgets is laid out
//! by stack/grid strategies, rendered into a double-buffered cell grid,
//! and flushed to the terminal as a minimal diff. A route table plus a
//! screen stack drives navigation between screens; the invocation gateway
//! is the single safe call path from the loop into any node, so one
//! malformed widget can never take the loop down.
//!
//! Typical wiring:
//!
//! ```no_run
//! use helm_tui::{context::TuiContext, router, runtime, terminal::CrosstermBackend};
//!
//! fn main() -> Result<(), String> {
//!     let mut ctx = TuiContext::new(Box::new(CrosstermBackend::new()));
//!     router::add_route(&mut ctx, "/", "Home", false, |ctx, _services| {
//!         helm_tui::tree::create_node(ctx, helm_tui::types::NodeKind::Screen)
//!     })
//!     .map_err(|e| e.to_string())?;
//!     router::go_to(&mut ctx, "/", Default::default()).map_err(|e| e.to_string())?;
//!     runtime::run(&mut ctx)
//! }
//! ```

pub mod context;
pub mod event;
pub mod gateway;
pub mod layout;
pub mod render;
pub mod router;
pub mod runtime;
pub mod style;
pub mod terminal;
pub mod tree;
pub mod types;
pub mod widgets;

pub use context::{BackgroundResult, CancelToken, TuiContext};
pub use gateway::{Capability, Diagnostic, ParamMap, Reply};
pub use layout::{Alignment, Axis, LayoutProps, LayoutStrategy, Rect, TrackSize};
pub use router::{NavError, NavPhase};
pub use types::{Buffer, Cell, CellAttrs, InputEvent, NodeKind};
