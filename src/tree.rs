//! Tree Module — Component tree CRUD operations.
//!
//! Responsibilities:
//! - Handle allocation (sequential u32, never recycled)
//! - Node creation/destruction
//! - Parent-child relationships (a node lives in at most one children list)
//! - Dirty-flag propagation to ancestors
//! - Z-ordered paint order

use crate::context::TuiContext;
use crate::gateway::{CapabilitySlots, ParamMap};
use crate::layout::{LayoutProps, LayoutStrategy, Rect};
use crate::style::VisualStyle;
use crate::types::NodeKind;

// ============================================================================
// Node
// ============================================================================

/// One node in the component tree: a panel (owns children and a layout
/// strategy) or a leaf widget (behavior lives in its capability slots).
/// Screens are nodes that additionally carry a state record.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// Assigned by the parent's arrange step; mutable after construction so
    /// a future measure pass can feed desired sizes in.
    pub bounds: Rect,
    pub visible: bool,
    pub focusable: bool,
    pub z_index: i32,
    /// Back-reference to the panel holding this node in its children list.
    /// Reparenting via `append_child` is the only way to change it.
    pub parent: Option<u32>,
    pub children: Vec<u32>,
    pub dirty: bool,
    /// Panels only; leaves keep `None`.
    pub layout: Option<LayoutStrategy>,
    /// Hints read by the parent panel's strategy, opaque to this node.
    pub layout_props: LayoutProps,
    pub visual_style: VisualStyle,
    pub capabilities: CapabilitySlots,
    /// Widget text content (label/button caption, input value).
    pub text: String,
    /// Grapheme cursor for editable widgets.
    pub cursor: usize,
    /// Screen state record: caller-defined fields, written by SetParams.
    pub state: ParamMap,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            bounds: Rect::default(),
            visible: true,
            focusable: false,
            z_index: 0,
            parent: None,
            children: Vec::new(),
            dirty: true,
            layout: None,
            layout_props: LayoutProps::default(),
            visual_style: VisualStyle::default(),
            capabilities: CapabilitySlots::default(),
            text: String::new(),
            cursor: 0,
            state: ParamMap::new(),
        }
    }
}

// ============================================================================
// CRUD
// ============================================================================

/// Allocate a new handle and create a node in the tree.
pub fn create_node(ctx: &mut TuiContext, kind: NodeKind) -> Result<u32, String> {
    let handle = ctx.next_handle;
    ctx.next_handle += 1;

    ctx.nodes.insert(handle, Node::new(kind));
    ctx.debug_log(&format!("create_node: kind={}, handle={handle}", kind.name()));
    Ok(handle)
}

/// Destroy a node. Detaches from parent. Orphans children (does not
/// cascade); use `destroy_subtree` to take a whole screen down.
pub fn destroy_node(ctx: &mut TuiContext, handle: u32) -> Result<(), String> {
    let node = ctx
        .nodes
        .remove(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?;

    // Detach from parent
    if let Some(parent_handle) = node.parent {
        if let Some(parent) = ctx.nodes.get_mut(&parent_handle) {
            parent.children.retain(|&h| h != handle);
            mark_dirty(ctx, parent_handle);
        }
    }

    // Orphan children: null the back-reference before they are considered
    // parentless.
    for &child in &node.children {
        if let Some(c) = ctx.nodes.get_mut(&child) {
            c.parent = None;
        }
    }

    if ctx.focused == Some(handle) {
        ctx.focused = None;
    }

    ctx.debug_log(&format!("destroy_node: handle={handle}"));
    Ok(())
}

/// Destroy a node and every descendant. Used when a screen is popped.
pub fn destroy_subtree(ctx: &mut TuiContext, handle: u32) -> Result<(), String> {
    let children = ctx
        .nodes
        .get(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?
        .children
        .clone();
    for child in children {
        // Descendants may already be gone if the caller raced a destroy;
        // that is not an error worth failing the pop for.
        let _ = destroy_subtree(ctx, child);
    }
    destroy_node(ctx, handle)
}

/// Append a child to a panel. Detaches the child from any previous parent
/// first, so a node is never contained by two panels simultaneously.
pub fn append_child(ctx: &mut TuiContext, parent: u32, child: u32) -> Result<(), String> {
    let parent_kind = ctx
        .nodes
        .get(&parent)
        .ok_or_else(|| format!("Invalid parent: {parent}"))?
        .kind;
    if !parent_kind.is_panel() {
        return Err(format!(
            "Node {parent} ({}) cannot own children",
            parent_kind.name()
        ));
    }

    let old_parent = ctx
        .nodes
        .get(&child)
        .ok_or_else(|| format!("Invalid child: {child}"))?
        .parent;

    if let Some(old) = old_parent {
        if old != parent {
            if let Some(old_node) = ctx.nodes.get_mut(&old) {
                old_node.children.retain(|&h| h != child);
            }
            mark_dirty(ctx, old);
        }
    }

    if let Some(p) = ctx.nodes.get_mut(&parent) {
        if !p.children.contains(&child) {
            p.children.push(child);
        }
    }
    if let Some(c) = ctx.nodes.get_mut(&child) {
        c.parent = Some(parent);
    }

    mark_dirty(ctx, parent);
    ctx.debug_log(&format!("append_child: parent={parent}, child={child}"));
    Ok(())
}

/// Remove a child from a parent. Nulls the back-reference.
pub fn remove_child(ctx: &mut TuiContext, parent: u32, child: u32) -> Result<(), String> {
    ctx.nodes
        .get(&parent)
        .ok_or_else(|| format!("Invalid parent: {parent}"))?;
    let actual = ctx
        .nodes
        .get(&child)
        .ok_or_else(|| format!("Invalid child: {child}"))?
        .parent;
    if actual != Some(parent) {
        return Err(format!("Node {child} is not a child of {parent}"));
    }

    if let Some(p) = ctx.nodes.get_mut(&parent) {
        p.children.retain(|&h| h != child);
    }
    if let Some(c) = ctx.nodes.get_mut(&child) {
        c.parent = None;
    }

    mark_dirty(ctx, parent);
    ctx.debug_log(&format!("remove_child: parent={parent}, child={child}"));
    Ok(())
}

// ============================================================================
// Dirty Flags
// ============================================================================

/// Mark a node and all its ancestors as dirty.
pub fn mark_dirty(ctx: &mut TuiContext, handle: u32) {
    let mut current = handle;
    while let Some(node) = ctx.nodes.get_mut(&current) {
        node.dirty = true;
        match node.parent {
            Some(parent) => current = parent,
            None => break,
        }
    }
}

/// Whether any node is dirty. The frame loop uses this to skip layout and
/// render entirely on idle frames.
pub fn any_dirty(ctx: &TuiContext) -> bool {
    ctx.nodes.values().any(|n| n.dirty)
}

/// Clear dirty flags on all nodes. Runs at the end of a presented frame.
pub fn clear_dirty_flags(ctx: &mut TuiContext) {
    for node in ctx.nodes.values_mut() {
        node.dirty = false;
    }
}

// ============================================================================
// Z-Order
// ============================================================================

/// Set a node's z-index within its siblings. Higher paints later (on top).
pub fn set_z_index(ctx: &mut TuiContext, handle: u32, z_index: i32) -> Result<(), String> {
    let node = ctx
        .nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?;
    node.z_index = z_index;
    let parent = node.parent.unwrap_or(handle);
    mark_dirty(ctx, parent);
    Ok(())
}

/// Children of a node in paint order: ascending z-index, insertion order
/// within equal z (stable sort). Hit-testing walks this in reverse.
pub fn paint_order(ctx: &TuiContext, handle: u32) -> Vec<u32> {
    let Some(node) = ctx.nodes.get(&handle) else {
        return Vec::new();
    };
    let mut order = node.children.clone();
    order.sort_by_key(|h| ctx.nodes.get(h).map(|n| n.z_index).unwrap_or(0));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::MockBackend;

    fn test_ctx() -> TuiContext {
        TuiContext::new(Box::new(MockBackend::new(80, 24)))
    }

    #[test]
    fn test_create_and_destroy() {
        let mut ctx = test_ctx();
        let h = create_node(&mut ctx, NodeKind::Panel).unwrap();
        assert!(h > 0);
        assert!(ctx.nodes.contains_key(&h));

        destroy_node(&mut ctx, h).unwrap();
        assert!(!ctx.nodes.contains_key(&h));
    }

    #[test]
    fn test_sequential_handles() {
        let mut ctx = test_ctx();
        let h1 = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let h2 = create_node(&mut ctx, NodeKind::Label).unwrap();
        let h3 = create_node(&mut ctx, NodeKind::TextInput).unwrap();
        assert_eq!(h1, 1);
        assert_eq!(h2, 2);
        assert_eq!(h3, 3);
    }

    #[test]
    fn test_append_and_remove_child() {
        let mut ctx = test_ctx();
        let parent = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let child = create_node(&mut ctx, NodeKind::Label).unwrap();

        append_child(&mut ctx, parent, child).unwrap();
        assert_eq!(ctx.nodes[&parent].children, vec![child]);
        assert_eq!(ctx.nodes[&child].parent, Some(parent));

        remove_child(&mut ctx, parent, child).unwrap();
        assert!(ctx.nodes[&parent].children.is_empty());
        assert_eq!(ctx.nodes[&child].parent, None);
    }

    #[test]
    fn test_leaf_cannot_own_children() {
        let mut ctx = test_ctx();
        let label = create_node(&mut ctx, NodeKind::Label).unwrap();
        let child = create_node(&mut ctx, NodeKind::Label).unwrap();
        assert!(append_child(&mut ctx, label, child).is_err());
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let mut ctx = test_ctx();
        let a = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let b = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let child = create_node(&mut ctx, NodeKind::Label).unwrap();

        append_child(&mut ctx, a, child).unwrap();
        append_child(&mut ctx, b, child).unwrap();

        // Never contained by two panels simultaneously
        assert!(ctx.nodes[&a].children.is_empty());
        assert_eq!(ctx.nodes[&b].children, vec![child]);
        assert_eq!(ctx.nodes[&child].parent, Some(b));
    }

    #[test]
    fn test_destroy_orphans_children() {
        let mut ctx = test_ctx();
        let parent = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let child = create_node(&mut ctx, NodeKind::Label).unwrap();
        append_child(&mut ctx, parent, child).unwrap();

        destroy_node(&mut ctx, parent).unwrap();
        assert!(ctx.nodes.contains_key(&child));
        assert_eq!(ctx.nodes[&child].parent, None);
    }

    #[test]
    fn test_destroy_subtree_cascades() {
        let mut ctx = test_ctx();
        let root = create_node(&mut ctx, NodeKind::Screen).unwrap();
        let mid = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let leaf = create_node(&mut ctx, NodeKind::Label).unwrap();
        append_child(&mut ctx, root, mid).unwrap();
        append_child(&mut ctx, mid, leaf).unwrap();

        destroy_subtree(&mut ctx, root).unwrap();
        assert!(ctx.nodes.is_empty());
    }

    #[test]
    fn test_dirty_propagation() {
        let mut ctx = test_ctx();
        let root = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let mid = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let leaf = create_node(&mut ctx, NodeKind::Label).unwrap();

        append_child(&mut ctx, root, mid).unwrap();
        append_child(&mut ctx, mid, leaf).unwrap();

        clear_dirty_flags(&mut ctx);
        assert!(!any_dirty(&ctx));

        mark_dirty(&mut ctx, leaf);
        assert!(ctx.nodes[&leaf].dirty);
        assert!(ctx.nodes[&mid].dirty);
        assert!(ctx.nodes[&root].dirty);
        assert!(any_dirty(&ctx));
    }

    #[test]
    fn test_destroy_clears_focus() {
        let mut ctx = test_ctx();
        let h = create_node(&mut ctx, NodeKind::TextInput).unwrap();
        ctx.focused = Some(h);
        destroy_node(&mut ctx, h).unwrap();
        assert_eq!(ctx.focused, None);
    }

    #[test]
    fn test_paint_order_sorts_by_z() {
        let mut ctx = test_ctx();
        let panel = create_node(&mut ctx, NodeKind::Panel).unwrap();
        let low = create_node(&mut ctx, NodeKind::Label).unwrap();
        let high = create_node(&mut ctx, NodeKind::Label).unwrap();
        let mid = create_node(&mut ctx, NodeKind::Label).unwrap();
        for &c in &[low, high, mid] {
            append_child(&mut ctx, panel, c).unwrap();
        }
        set_z_index(&mut ctx, high, 10).unwrap();
        set_z_index(&mut ctx, mid, 5).unwrap();

        assert_eq!(paint_order(&ctx, panel), vec![low, mid, high]);
    }

    #[test]
    fn test_handle_zero_invalid() {
        let ctx = test_ctx();
        assert!(ctx.validate_node(0).is_err());
    }
}
