//! Gateway Module — Safe capability dispatch into tree nodes.
//!
//! Responsibilities:
//! - Capability slot model: a node has a callable bound per name, or not
//! - The single sanctioned call path from the loop (or a parent) into a node
//! - Fault containment: a panicking or erroring callable never reaches the
//!   caller; it becomes a diagnostic plus a re-render request
//!
//! The same catch_unwind discipline the FFI boundary of this engine's
//! ancestry used is applied here at the node-dispatch boundary: the loop
//! must survive any single malformed or partially-constructed node.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use serde::Serialize;

use crate::context::TuiContext;
use crate::types::InputEvent;

/// Parameter bag passed to screens at navigation commit and carried in
/// screen state records.
pub type ParamMap = HashMap<String, serde_json::Value>;

// ============================================================================
// Capabilities
// ============================================================================

/// The fixed, known set of capability names a node may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Render,
    HandleInput,
    SetParams,
}

impl Capability {
    pub fn name(self) -> &'static str {
        match self {
            Self::Render => "Render",
            Self::HandleInput => "HandleInput",
            Self::SetParams => "SetParams",
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Render => 0,
            Self::HandleInput => 1,
            Self::SetParams => 2,
        }
    }
}

/// What a capability invocation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Node absent, slot unbound, or fault contained. Always safe to ignore.
    NoOp,
    /// Ran to completion with no payload (Render, SetParams).
    Done,
    /// HandleInput: the event was consumed.
    Consumed,
    /// HandleInput: the event was not consumed; callers may bubble it.
    Ignored,
}

/// Call payload handed to a bound callable. The receiver node is injected
/// by the gateway; the owning screen rides along explicitly instead of
/// being captured lexically by the handler.
pub struct CapabilityCall<'a> {
    pub node: u32,
    pub screen: Option<u32>,
    pub event: Option<&'a InputEvent>,
    pub params: Option<&'a ParamMap>,
}

/// A bound capability. Shared via Rc so dispatch can detach the callable
/// from the arena before handing the whole context to it.
pub type CapabilityFn = dyn Fn(&mut TuiContext, &CapabilityCall) -> Result<Reply, String>;

/// Per-node capability slots: each name is present-and-callable or absent.
#[derive(Clone, Default)]
pub struct CapabilitySlots {
    slots: [Option<Rc<CapabilityFn>>; 3],
}

impl CapabilitySlots {
    pub fn bind(
        &mut self,
        capability: Capability,
        f: impl Fn(&mut TuiContext, &CapabilityCall) -> Result<Reply, String> + 'static,
    ) {
        self.slots[capability.slot()] = Some(Rc::new(f));
    }

    pub fn unbind(&mut self, capability: Capability) {
        self.slots[capability.slot()] = None;
    }

    pub fn get(&self, capability: Capability) -> Option<Rc<CapabilityFn>> {
        self.slots[capability.slot()].clone()
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.slots[capability.slot()].is_some()
    }
}

impl std::fmt::Debug for CapabilitySlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound: Vec<&str> = [
            Capability::Render,
            Capability::HandleInput,
            Capability::SetParams,
        ]
        .into_iter()
        .filter(|c| self.has(*c))
        .map(Capability::name)
        .collect();
        f.debug_struct("CapabilitySlots").field("bound", &bound).finish()
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// One contained fault: which kind of node, which capability, what broke.
/// Serializable so hosts can export the log alongside the history trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub source: String,
    pub capability: &'static str,
    pub message: String,
}

// ============================================================================
// Dispatch
// ============================================================================

/// Caller-supplied invocation arguments; the gateway injects the receiver.
#[derive(Default)]
pub struct InvokeArgs<'a> {
    pub screen: Option<u32>,
    pub event: Option<&'a InputEvent>,
    pub params: Option<&'a ParamMap>,
}

/// Invoke a named capability on a node.
///
/// Absent node or unbound slot → `Reply::NoOp`, silently. A callable that
/// returns `Err` or panics is contained: one diagnostic is recorded, a
/// re-render is requested so any error affordance becomes visible, and the
/// caller gets `Reply::NoOp`. This function never propagates a child fault.
pub fn invoke(
    ctx: &mut TuiContext,
    node: u32,
    capability: Capability,
    args: InvokeArgs<'_>,
) -> Reply {
    let (kind, callable) = match ctx.nodes.get(&node) {
        Some(n) => (n.kind, n.capabilities.get(capability)),
        None => return Reply::NoOp,
    };
    let Some(callable) = callable else {
        return Reply::NoOp;
    };

    let call = CapabilityCall {
        node,
        screen: args.screen,
        event: args.event,
        params: args.params,
    };

    match catch_unwind(AssertUnwindSafe(|| callable(ctx, &call))) {
        Ok(Ok(reply)) => reply,
        Ok(Err(message)) => {
            contain_fault(ctx, kind.name(), capability, message);
            Reply::NoOp
        }
        Err(panic) => {
            let message = panic_message(&panic);
            contain_fault(ctx, kind.name(), capability, message);
            Reply::NoOp
        }
    }
}

fn contain_fault(ctx: &mut TuiContext, source: &str, capability: Capability, message: String) {
    ctx.debug_log(&format!(
        "invocation fault: {source}.{}: {message}",
        capability.name()
    ));
    ctx.diagnostics.push(Diagnostic {
        source: source.to_string(),
        capability: capability.name(),
        message,
    });
    ctx.needs_render = true;
}

pub(crate) fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal panic".to_string()
    }
}
