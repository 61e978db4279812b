//! Router Module — Route table, screen stack, and navigation transitions.
//!
//! Responsibilities:
//! - Route registration (path → factory + title + auth flag)
//! - The go_to state machine: Guarding → Authorizing → Instantiating →
//!   Committing → Hooking
//! - Screen stack ownership (top = active, root never removable)
//! - Unified append-only history and the breadcrumb trail
//!
//! History is one log shared by route navigation and back-navigation: go_to
//! appends at commit, back pops screens without erasing entries, so the log
//! stays a truthful audit trail of how the user got here.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::SystemTime;

use serde::Serialize;

use crate::context::TuiContext;
use crate::gateway::{self, Capability, Diagnostic, InvokeArgs, ParamMap};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    /// Malformed registration; fatal to that registration call only.
    BadRoute(String),
    /// No route at the normalized path.
    UnknownRoute(String),
    /// A before-navigate guard refused the transition.
    Rejected,
    /// The route requires auth and the check failed (or none is installed).
    AuthRequired,
    /// The screen factory returned an error or panicked.
    FactoryFailed(String),
    /// Back would pop the last remaining screen.
    AtRoot,
}

impl std::fmt::Display for NavError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRoute(msg) => write!(f, "bad route: {msg}"),
            Self::UnknownRoute(path) => write!(f, "unknown route: {path}"),
            Self::Rejected => write!(f, "navigation rejected by guard"),
            Self::AuthRequired => write!(f, "authorization required"),
            Self::FactoryFailed(msg) => write!(f, "screen factory failed: {msg}"),
            Self::AtRoot => write!(f, "cannot pop the root screen"),
        }
    }
}

impl std::error::Error for NavError {}

// ============================================================================
// Routes & Navigation State
// ============================================================================

/// Produces a screen subtree root, or signals failure. Never returns a
/// usable-but-incomplete screen. The services bundle passes through the
/// core unexamined.
pub type ScreenFactory = dyn Fn(&mut TuiContext, Option<Rc<dyn Any>>) -> Result<u32, String>;

/// Before-navigate interceptor; `false` aborts the transition.
pub type GuardFn = dyn Fn(&TuiContext, &str) -> bool;

/// After-navigate observer. Faults are logged, never fatal.
pub type HookFn = dyn Fn(&mut TuiContext, &HistoryEntry) -> Result<(), String>;

pub type AuthCheckFn = dyn Fn(&TuiContext) -> bool;

#[derive(Clone)]
pub struct Route {
    pub path: String,
    pub title: String,
    pub requires_auth: bool,
    factory: Rc<ScreenFactory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPhase {
    Idle,
    Guarding,
    Authorizing,
    Instantiating,
    Committing,
    Hooking,
}

/// One mounted screen on the stack.
#[derive(Debug, Clone)]
pub struct StackEntry {
    pub node: u32,
    pub path: String,
    pub title: String,
}

/// One committed navigation, kept even after the screen is discarded.
/// Serializable: the history log is the exportable audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub path: String,
    pub timestamp: SystemTime,
    pub params: ParamMap,
}

pub struct NavigationState {
    routes: HashMap<String, Route>,
    stack: Vec<StackEntry>,
    pub history: Vec<HistoryEntry>,
    pub breadcrumbs: Vec<String>,
    pub breadcrumbs_enabled: bool,
    guards: Vec<Rc<GuardFn>>,
    hooks: Vec<Rc<HookFn>>,
    auth_check: Option<Rc<AuthCheckFn>>,
    services: Option<Rc<dyn Any>>,
    pub phase: NavPhase,
}

impl NavigationState {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            stack: Vec::new(),
            history: Vec::new(),
            breadcrumbs: Vec::new(),
            breadcrumbs_enabled: true,
            guards: Vec::new(),
            hooks: Vec::new(),
            auth_check: None,
            services: None,
            phase: NavPhase::Idle,
        }
    }

    /// The input-receiving screen: top of the stack.
    pub fn active_screen(&self) -> Option<u32> {
        self.stack.last().map(|e| e.node)
    }

    pub fn active_path(&self) -> Option<&str> {
        self.stack.last().map(|e| e.path.as_str())
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Screens currently mounted (layout keeps all of them current).
    pub fn mounted_roots(&self) -> Vec<u32> {
        self.stack.iter().map(|e| e.node).collect()
    }

    /// Render layers, bottom to top. Today the single active screen; a
    /// dialog layer slots into this list without restructuring ownership.
    pub fn visible_layers(&self) -> Vec<u32> {
        self.stack.last().map(|e| e.node).into_iter().collect()
    }

    pub fn route(&self, path: &str) -> Option<&Route> {
        self.routes.get(path)
    }

    /// Push a bare node as a mounted screen, bypassing the route machinery.
    #[cfg(test)]
    pub(crate) fn mount_for_test(&mut self, node: u32) {
        self.stack.push(StackEntry {
            node,
            path: "/".to_string(),
            title: String::new(),
        });
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Normalize a path: trimmed, leading slash enforced, trailing slash
/// dropped (except for the root path itself).
pub fn normalize_path(path: &str) -> Result<String, NavError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(NavError::BadRoute("empty path".to_string()));
    }
    if trimmed.contains(char::is_whitespace) {
        return Err(NavError::BadRoute(format!(
            "path contains whitespace: {trimmed:?}"
        )));
    }
    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    Ok(normalized)
}

/// Register a route. Re-registering a path replaces the previous route, so
/// bootstrap can override a default set.
pub fn add_route(
    ctx: &mut TuiContext,
    path: &str,
    title: &str,
    requires_auth: bool,
    factory: impl Fn(&mut TuiContext, Option<Rc<dyn Any>>) -> Result<u32, String> + 'static,
) -> Result<(), NavError> {
    let path = normalize_path(path)?;
    ctx.debug_log(&format!("add_route: {path}"));
    ctx.nav.routes.insert(
        path.clone(),
        Route {
            path,
            title: title.to_string(),
            requires_auth,
            factory: Rc::new(factory),
        },
    );
    Ok(())
}

/// Remove a route. Mounted screens created from it are unaffected.
pub fn remove_route(ctx: &mut TuiContext, path: &str) -> Result<(), NavError> {
    let path = normalize_path(path)?;
    ctx.nav
        .routes
        .remove(&path)
        .map(|_| ())
        .ok_or(NavError::UnknownRoute(path))
}

/// Append a before-navigate guard. Guards run in registration order.
pub fn add_guard(ctx: &mut TuiContext, guard: impl Fn(&TuiContext, &str) -> bool + 'static) {
    ctx.nav.guards.push(Rc::new(guard));
}

/// Append an after-navigate hook. Hooks run in registration order.
pub fn add_hook(
    ctx: &mut TuiContext,
    hook: impl Fn(&mut TuiContext, &HistoryEntry) -> Result<(), String> + 'static,
) {
    ctx.nav.hooks.push(Rc::new(hook));
}

/// Install the auth check consulted for routes with `requires_auth`.
pub fn set_auth_check(ctx: &mut TuiContext, check: impl Fn(&TuiContext) -> bool + 'static) {
    ctx.nav.auth_check = Some(Rc::new(check));
}

/// Attach an opaque services bundle handed to every screen factory.
pub fn set_services(ctx: &mut TuiContext, services: Rc<dyn Any>) {
    ctx.nav.services = Some(services);
}

// ============================================================================
// Transitions
// ============================================================================

/// Navigate to a route. On success the new screen is on top of the stack,
/// one history entry is appended, and SetParams has run with any non-empty
/// params. On any failure the stack and history are untouched.
pub fn go_to(ctx: &mut TuiContext, path: &str, params: ParamMap) -> Result<(), NavError> {
    let result = go_to_inner(ctx, path, params);
    ctx.nav.phase = NavPhase::Idle;
    if let Err(err) = &result {
        ctx.debug_log(&format!("go_to failed: {err}"));
    }
    result
}

fn go_to_inner(ctx: &mut TuiContext, path: &str, params: ParamMap) -> Result<(), NavError> {
    let path = normalize_path(path)?;
    let route = ctx
        .nav
        .route(&path)
        .cloned()
        .ok_or_else(|| NavError::UnknownRoute(path.clone()))?;

    // Guarding: any false aborts; nothing has been mutated yet, so the
    // previous active screen simply stays active.
    ctx.nav.phase = NavPhase::Guarding;
    let guards = ctx.nav.guards.clone();
    for guard in guards {
        if !guard(ctx, &path) {
            return Err(NavError::Rejected);
        }
    }

    // Authorizing: identical abort semantics to a guard rejection. No
    // installed check means auth-gated routes are unreachable.
    if route.requires_auth {
        ctx.nav.phase = NavPhase::Authorizing;
        let authorized = match ctx.nav.auth_check.clone() {
            Some(check) => check(ctx),
            None => false,
        };
        if !authorized {
            return Err(NavError::AuthRequired);
        }
    }

    // Instantiating: a factory fault aborts with the stack unchanged and
    // surfaces as a diagnostic so an error affordance can render.
    ctx.nav.phase = NavPhase::Instantiating;
    let services = ctx.nav.services.clone();
    let factory = route.factory.clone();
    let produced = catch_unwind(AssertUnwindSafe(|| factory(ctx, services)));
    let node = match produced {
        Ok(Ok(node)) => node,
        Ok(Err(message)) => return Err(instantiation_failed(ctx, &path, message)),
        Err(panic) => {
            let message = gateway::panic_message(&panic);
            return Err(instantiation_failed(ctx, &path, message));
        }
    };
    if ctx.nodes.get(&node).is_none() {
        return Err(instantiation_failed(
            ctx,
            &path,
            format!("factory returned dangling node {node}"),
        ));
    }

    // Committing: stack push, history append, breadcrumb, SetParams.
    ctx.nav.phase = NavPhase::Committing;
    ctx.nav.stack.push(StackEntry {
        node,
        path: path.clone(),
        title: route.title.clone(),
    });
    let entry = HistoryEntry {
        path: path.clone(),
        timestamp: SystemTime::now(),
        params: params.clone(),
    };
    ctx.nav.history.push(entry.clone());
    if ctx.nav.breadcrumbs_enabled && ctx.nav.depth() > 1 {
        ctx.nav.breadcrumbs.push(route.title.clone());
    }
    ctx.focused = None;
    crate::tree::mark_dirty(ctx, node);
    ctx.needs_render = true;
    if !params.is_empty() {
        // Gateway contains any SetParams fault; the commit stands.
        gateway::invoke(
            ctx,
            node,
            Capability::SetParams,
            InvokeArgs {
                screen: Some(node),
                params: Some(&params),
                ..InvokeArgs::default()
            },
        );
    }
    ctx.debug_log(&format!("go_to: {path} (depth {})", ctx.nav.depth()));

    // Hooking: observational; faults become diagnostics.
    ctx.nav.phase = NavPhase::Hooking;
    let hooks = ctx.nav.hooks.clone();
    for hook in hooks {
        let outcome = catch_unwind(AssertUnwindSafe(|| hook(ctx, &entry)));
        let fault = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(message)) => Some(message),
            Err(panic) => Some(gateway::panic_message(&panic)),
        };
        if let Some(message) = fault {
            ctx.debug_log(&format!("hook fault after {path}: {message}"));
            ctx.diagnostics.push(Diagnostic {
                source: "router".to_string(),
                capability: "AfterNavigate",
                message,
            });
        }
    }

    Ok(())
}

fn instantiation_failed(ctx: &mut TuiContext, path: &str, message: String) -> NavError {
    ctx.diagnostics.push(Diagnostic {
        source: "router".to_string(),
        capability: "Instantiate",
        message: format!("{path}: {message}"),
    });
    ctx.needs_render = true;
    NavError::FactoryFailed(message)
}

/// Pop up to `steps` screens. The root screen is never removable. Returns
/// how many steps actually completed; completing zero of a positive
/// request is `AtRoot`. Popped screens' subtrees are destroyed; history
/// entries persist as the audit trail.
pub fn back(ctx: &mut TuiContext, steps: usize) -> Result<usize, NavError> {
    let mut completed = 0;
    while completed < steps && ctx.nav.depth() > 1 {
        let entry = ctx.nav.stack.pop().expect("depth checked above");
        ctx.nav.breadcrumbs.pop();
        if let Err(err) = crate::tree::destroy_subtree(ctx, entry.node) {
            ctx.debug_log(&format!("back: discard of {} failed: {err}", entry.path));
        }
        completed += 1;
    }

    if completed == 0 && steps > 0 {
        return Err(NavError::AtRoot);
    }

    if completed > 0 {
        ctx.focused = None;
        if let Some(top) = ctx.nav.active_screen() {
            crate::tree::mark_dirty(ctx, top);
        }
        ctx.needs_render = true;
        ctx.debug_log(&format!("back: popped {completed} (depth {})", ctx.nav.depth()));
    }
    Ok(completed)
}
