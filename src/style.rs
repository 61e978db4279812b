//! Style Module — Visual style storage and resolution.
//!
//! Responsibilities:
//! - VisualStyle storage per node
//! - Color, text decoration, border, and padding setters
//! - Content-bounds inset (outer bounds minus border minus padding)

use crate::context::TuiContext;
use crate::layout::Rect;
use crate::types::{BorderStyle, CellAttrs, COLOR_DEFAULT};

// ============================================================================
// Edges & VisualStyle
// ============================================================================

/// Per-side cell counts, used for padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Edges {
    pub fn uniform(n: u16) -> Self {
        Self {
            top: n,
            right: n,
            bottom: n,
            left: n,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisualStyle {
    pub fg: u32,
    pub bg: u32,
    pub attrs: CellAttrs,
    pub border: BorderStyle,
    pub border_color: u32,
    pub padding: Edges,
}

impl Default for VisualStyle {
    fn default() -> Self {
        Self {
            fg: COLOR_DEFAULT,
            bg: COLOR_DEFAULT,
            attrs: CellAttrs::empty(),
            border: BorderStyle::None,
            border_color: COLOR_DEFAULT,
            padding: Edges::default(),
        }
    }
}

impl VisualStyle {
    /// Shrink an outer rect to the content area inside border and padding.
    /// Degenerate insets clamp to a zero-sized rect; a bad panel must not
    /// fail the frame.
    pub fn content_bounds(&self, outer: Rect) -> Rect {
        let b = self.border.thickness() as i32;
        let left = b + self.padding.left as i32;
        let top = b + self.padding.top as i32;
        let right = b + self.padding.right as i32;
        let bottom = b + self.padding.bottom as i32;
        Rect {
            x: outer.x + left,
            y: outer.y + top,
            width: (outer.width - left - right).max(0),
            height: (outer.height - top - bottom).max(0),
        }
    }
}

// ============================================================================
// Setters
// ============================================================================

/// Set the foreground color on a node.
pub fn set_fg(ctx: &mut TuiContext, handle: u32, color: u32) -> Result<(), String> {
    ctx.nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?
        .visual_style
        .fg = color;
    crate::tree::mark_dirty(ctx, handle);
    Ok(())
}

/// Set the background color on a node.
pub fn set_bg(ctx: &mut TuiContext, handle: u32, color: u32) -> Result<(), String> {
    ctx.nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?
        .visual_style
        .bg = color;
    crate::tree::mark_dirty(ctx, handle);
    Ok(())
}

/// Toggle a text decoration flag (bold, underline, ...).
pub fn set_attr(
    ctx: &mut TuiContext,
    handle: u32,
    attr: CellAttrs,
    enabled: bool,
) -> Result<(), String> {
    let node = ctx
        .nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?;
    if enabled {
        node.visual_style.attrs |= attr;
    } else {
        node.visual_style.attrs.remove(attr);
    }
    crate::tree::mark_dirty(ctx, handle);
    Ok(())
}

/// Set the border style on a node. Changes border thickness, so the node's
/// content bounds shift and layout must rerun.
pub fn set_border(ctx: &mut TuiContext, handle: u32, border: BorderStyle) -> Result<(), String> {
    ctx.nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?
        .visual_style
        .border = border;
    crate::tree::mark_dirty(ctx, handle);
    Ok(())
}

/// Set the border color on a node.
pub fn set_border_color(ctx: &mut TuiContext, handle: u32, color: u32) -> Result<(), String> {
    ctx.nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?
        .visual_style
        .border_color = color;
    crate::tree::mark_dirty(ctx, handle);
    Ok(())
}

/// Set padding on a node.
pub fn set_padding(ctx: &mut TuiContext, handle: u32, padding: Edges) -> Result<(), String> {
    ctx.nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?
        .visual_style
        .padding = padding;
    crate::tree::mark_dirty(ctx, handle);
    Ok(())
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

    #[test]
    fn test_content_bounds_border_and_padding() {
        let style = VisualStyle {
            border: BorderStyle::Single,
            padding: Edges::uniform(1),
            ..VisualStyle::default()
        };
        let outer = Rect {
            x: 2,
            y: 3,
            width: 10,
            height: 6,
        };
        let inner = style.content_bounds(outer);
        assert_eq!(
            inner,
            Rect {
                x: 4,
                y: 5,
                width: 6,
                height: 2
            }
        );
    }

    #[test]
    fn test_content_bounds_clamps_to_zero() {
        let style = VisualStyle {
            border: BorderStyle::Single,
            padding: Edges::uniform(3),
            ..VisualStyle::default()
        };
        let outer = Rect {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        };
        let inner = style.content_bounds(outer);
        assert_eq!(inner.width, 0);
        assert_eq!(inner.height, 0);
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut ctx = test_ctx();
        let h = tree::create_node(&mut ctx, NodeKind::Panel).unwrap();
        tree::clear_dirty_flags(&mut ctx);

        set_border(&mut ctx, h, BorderStyle::Double).unwrap();
        assert!(ctx.nodes[&h].dirty);
        assert_eq!(ctx.nodes[&h].visual_style.border, BorderStyle::Double);

        tree::clear_dirty_flags(&mut ctx);
        set_attr(&mut ctx, h, CellAttrs::BOLD, true).unwrap();
        assert!(ctx.nodes[&h].visual_style.attrs.contains(CellAttrs::BOLD));
        set_attr(&mut ctx, h, CellAttrs::BOLD, false).unwrap();
        assert!(!ctx.nodes[&h].visual_style.attrs.contains(CellAttrs::BOLD));
    }

    #[test]
    fn test_setter_invalid_handle() {
        let mut ctx = test_ctx();
        assert!(set_fg(&mut ctx, 99, 0).is_err());
    }
}
