//! Widgets Module — Built-in capability-bearing leaf nodes.
//!
//! Responsibilities:
//! - Label, button, and text input constructors
//! - Their Render / HandleInput capabilities, bound through the gateway
//!   slot model (the render loop never calls a widget directly)
//! - Grapheme-aware single-line editing for the text input
//!
//! Widgets are deliberately thin: state lives on the node (text, cursor),
//! behavior lives in the bound capabilities, and anything fancier belongs
//! to the application as a Custom node with its own bindings.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::context::TuiContext;
use crate::gateway::{Capability, CapabilityCall, Reply};
use crate::layout::Rect;
use crate::tree;
use crate::types::{key, Buffer, CellAttrs, InputEvent, NodeKind};

// ============================================================================
// Text Drawing
// ============================================================================

/// Draw text into a rect, wrapping on width and newlines. Writes clip to
/// the rect and to the buffer; columns advance by display width so wide
/// glyphs stay aligned.
pub fn draw_text(
    buf: &mut Buffer,
    rect: Rect,
    text: &str,
    fg: u32,
    bg: u32,
    attrs: CellAttrs,
) {
    let mut col = 0i32;
    let mut row = 0i32;

    for ch in text.chars() {
        if row >= rect.height {
            break;
        }
        if ch == '\n' {
            row += 1;
            col = 0;
            continue;
        }
        let char_width = UnicodeWidthStr::width(ch.to_string().as_str()) as i32;
        if col + char_width > rect.width {
            row += 1;
            col = 0;
            if row >= rect.height {
                break;
            }
        }
        if col < rect.width {
            let x = rect.x + col;
            let y = rect.y + row;
            if x >= 0 && y >= 0 {
                buf.put(x as u16, y as u16, ch, fg, bg, attrs);
            }
        }
        col += char_width;
    }
}

fn display_width(text: &str) -> i32 {
    UnicodeWidthStr::width(text) as i32
}

/// Node text + the fields its Render capability needs, cloned out of the
/// arena so the buffer can be borrowed mutably.
fn snapshot(ctx: &TuiContext, handle: u32) -> Option<(String, Rect, u32, u32, CellAttrs)> {
    let node = ctx.nodes.get(&handle)?;
    let rect = node.visual_style.content_bounds(node.bounds);
    Some((
        node.text.clone(),
        rect,
        node.visual_style.fg,
        node.visual_style.bg,
        node.visual_style.attrs,
    ))
}

// ============================================================================
// Label
// ============================================================================

/// A static text leaf. Sized to its text; restyle or resize as needed.
pub fn label(ctx: &mut TuiContext, text: &str) -> Result<u32, String> {
    let handle = tree::create_node(ctx, NodeKind::Label)?;
    let node = ctx.nodes.get_mut(&handle).expect("just created");
    node.text = text.to_string();
    node.bounds.width = display_width(text);
    node.bounds.height = 1;
    node.capabilities.bind(Capability::Render, |ctx, call| {
        let Some((text, rect, fg, bg, attrs)) = snapshot(ctx, call.node) else {
            return Ok(Reply::NoOp);
        };
        draw_text(&mut ctx.back_buffer, rect, &text, fg, bg, attrs);
        Ok(Reply::Done)
    });
    Ok(handle)
}

/// Replace a widget's text. Labels re-measure their intrinsic width.
pub fn set_text(ctx: &mut TuiContext, handle: u32, text: &str) -> Result<(), String> {
    let node = ctx
        .nodes
        .get_mut(&handle)
        .ok_or_else(|| format!("Invalid node: {handle}"))?;
    node.text = text.to_string();
    node.cursor = node.cursor.min(node.text.graphemes(true).count());
    if node.kind == NodeKind::Label {
        node.bounds.width = display_width(text);
    }
    tree::mark_dirty(ctx, handle);
    Ok(())
}

// ============================================================================
// Button
// ============================================================================

/// A focusable press target. Enter or space fires `on_press`; the handler
/// gets the call payload, so the owning screen arrives explicitly rather
/// than by lexical capture.
pub fn button(
    ctx: &mut TuiContext,
    caption: &str,
    on_press: impl Fn(&mut TuiContext, &CapabilityCall) -> Result<(), String> + 'static,
) -> Result<u32, String> {
    let handle = tree::create_node(ctx, NodeKind::Button)?;
    let node = ctx.nodes.get_mut(&handle).expect("just created");
    node.text = caption.to_string();
    node.focusable = true;
    node.bounds.width = display_width(caption) + 4; // "[ caption ]"
    node.bounds.height = 1;

    node.capabilities.bind(Capability::Render, |ctx, call| {
        let Some((caption, rect, fg, bg, mut attrs)) = snapshot(ctx, call.node) else {
            return Ok(Reply::NoOp);
        };
        if ctx.focused == Some(call.node) {
            attrs |= CellAttrs::REVERSE;
        }
        draw_text(
            &mut ctx.back_buffer,
            rect,
            &format!("[ {caption} ]"),
            fg,
            bg,
            attrs,
        );
        Ok(Reply::Done)
    });

    node.capabilities.bind(Capability::HandleInput, move |ctx, call| {
        let pressed = matches!(
            call.event,
            Some(InputEvent::Key { code, character, .. })
                if *code == key::ENTER || *character == ' '
        ) || matches!(
            call.event,
            Some(InputEvent::Mouse { button, .. }) if *button == 0
        );
        if pressed {
            on_press(ctx, call)?;
            Ok(Reply::Consumed)
        } else {
            Ok(Reply::Ignored)
        }
    });

    Ok(handle)
}

// ============================================================================
// Text Input
// ============================================================================

/// A focusable single-line editor. The cursor indexes graphemes, not
/// bytes, so multi-byte input edits cleanly.
pub fn text_input(ctx: &mut TuiContext, width: i32) -> Result<u32, String> {
    let handle = tree::create_node(ctx, NodeKind::TextInput)?;
    let node = ctx.nodes.get_mut(&handle).expect("just created");
    node.focusable = true;
    node.bounds.width = width.max(1);
    node.bounds.height = 1;

    node.capabilities.bind(Capability::Render, |ctx, call| {
        let Some((text, rect, fg, bg, attrs)) = snapshot(ctx, call.node) else {
            return Ok(Reply::NoOp);
        };
        draw_text(&mut ctx.back_buffer, rect, &text, fg, bg, attrs);

        // Inverted cell marks the cursor while focused.
        if ctx.focused == Some(call.node) {
            let cursor = ctx.nodes[&call.node].cursor;
            let prefix: String = text.graphemes(true).take(cursor).collect();
            let offset = display_width(&prefix);
            if offset < rect.width && rect.x + offset >= 0 && rect.y >= 0 {
                let under = text.graphemes(true).nth(cursor).and_then(|g| {
                    g.chars().next()
                });
                ctx.back_buffer.put(
                    (rect.x + offset) as u16,
                    rect.y as u16,
                    under.unwrap_or(' '),
                    fg,
                    bg,
                    attrs | CellAttrs::REVERSE,
                );
            }
        }
        Ok(Reply::Done)
    });

    node.capabilities.bind(Capability::HandleInput, |ctx, call| {
        let Some(InputEvent::Key {
            code, character, ..
        }) = call.event
        else {
            return Ok(Reply::Ignored);
        };
        let node = ctx
            .nodes
            .get_mut(&call.node)
            .ok_or_else(|| format!("Invalid node: {}", call.node))?;

        let count = node.text.graphemes(true).count();
        let consumed = match *code {
            key::LEFT => {
                node.cursor = node.cursor.saturating_sub(1);
                true
            }
            key::RIGHT => {
                node.cursor = (node.cursor + 1).min(count);
                true
            }
            key::HOME => {
                node.cursor = 0;
                true
            }
            key::END => {
                node.cursor = count;
                true
            }
            key::BACKSPACE => {
                if node.cursor > 0 {
                    let byte = grapheme_byte_index(&node.text, node.cursor - 1);
                    let end = grapheme_byte_index(&node.text, node.cursor);
                    node.text.replace_range(byte..end, "");
                    node.cursor -= 1;
                }
                true
            }
            key::DELETE => {
                if node.cursor < count {
                    let byte = grapheme_byte_index(&node.text, node.cursor);
                    let end = grapheme_byte_index(&node.text, node.cursor + 1);
                    node.text.replace_range(byte..end, "");
                }
                true
            }
            _ if *character != '\0' && !character.is_control() => {
                let byte = grapheme_byte_index(&node.text, node.cursor);
                node.text.insert(byte, *character);
                node.cursor += 1;
                true
            }
            _ => false,
        };

        if consumed {
            tree::mark_dirty(ctx, call.node);
            Ok(Reply::Consumed)
        } else {
            Ok(Reply::Ignored)
        }
    });

    Ok(handle)
}

/// Byte offset of the nth grapheme (text length when past the end).
fn grapheme_byte_index(text: &str, n: usize) -> usize {
    text.grapheme_indices(true)
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{self, InvokeArgs};
    use crate::terminal::MockBackend;

    fn test_ctx() -> TuiContext {
        TuiContext::new(Box::new(MockBackend::new(40, 10)))
    }

    fn key_event(code: u32, character: char) -> InputEvent {
        InputEvent::Key {
            code,
            modifiers: 0,
            character,
        }
    }

    fn send_key(ctx: &mut TuiContext, handle: u32, code: u32, character: char) -> Reply {
        let event = key_event(code, character);
        gateway::invoke(
            ctx,
            handle,
            Capability::HandleInput,
            InvokeArgs {
                event: Some(&event),
                ..InvokeArgs::default()
            },
        )
    }

    #[test]
    fn test_draw_text_wraps_and_clips() {
        let mut buf = Buffer::new(10, 3);
        draw_text(
            &mut buf,
            Rect::new(0, 0, 4, 2),
            "abcdefghij",
            0,
            0,
            CellAttrs::empty(),
        );
        assert_eq!(buf.get(0, 0).unwrap().ch, 'a');
        assert_eq!(buf.get(3, 0).unwrap().ch, 'd');
        assert_eq!(buf.get(0, 1).unwrap().ch, 'e');
        // Third row clipped by rect height
        assert_eq!(buf.get(0, 2).unwrap().ch, ' ');
        // Column 4 outside the rect untouched
        assert_eq!(buf.get(4, 0).unwrap().ch, ' ');
    }

    #[test]
    fn test_label_measures_intrinsic_size() {
        let mut ctx = test_ctx();
        let h = label(&mut ctx, "status").unwrap();
        assert_eq!(ctx.nodes[&h].bounds.width, 6);
        assert_eq!(ctx.nodes[&h].bounds.height, 1);

        set_text(&mut ctx, h, "ok").unwrap();
        assert_eq!(ctx.nodes[&h].bounds.width, 2);
    }

    #[test]
    fn test_label_renders_through_gateway() {
        let mut ctx = test_ctx();
        let h = label(&mut ctx, "hi").unwrap();
        ctx.nodes.get_mut(&h).unwrap().bounds = Rect::new(3, 2, 5, 1);

        let reply = gateway::invoke(&mut ctx, h, Capability::Render, InvokeArgs::default());
        assert_eq!(reply, Reply::Done);
        assert_eq!(ctx.back_buffer.get(3, 2).unwrap().ch, 'h');
        assert_eq!(ctx.back_buffer.get(4, 2).unwrap().ch, 'i');
    }

    #[test]
    fn test_button_press_fires_on_enter_only() {
        let mut ctx = test_ctx();
        let h = button(&mut ctx, "Save", |ctx, call| {
            ctx.nodes.get_mut(&call.node).unwrap().text = "Saved".into();
            Ok(())
        })
        .unwrap();

        assert_eq!(send_key(&mut ctx, h, key::LEFT, '\0'), Reply::Ignored);
        assert_eq!(ctx.nodes[&h].text, "Save");

        assert_eq!(send_key(&mut ctx, h, key::ENTER, '\0'), Reply::Consumed);
        assert_eq!(ctx.nodes[&h].text, "Saved");
    }

    #[test]
    fn test_button_press_fault_is_contained() {
        let mut ctx = test_ctx();
        let h = button(&mut ctx, "Boom", |_, _| Err("handler broke".into())).unwrap();

        let reply = send_key(&mut ctx, h, key::ENTER, '\0');
        assert_eq!(reply, Reply::NoOp);
        assert_eq!(ctx.diagnostics.len(), 1);
        assert_eq!(ctx.diagnostics[0].source, "button");
    }

    #[test]
    fn test_text_input_typing_and_cursor() {
        let mut ctx = test_ctx();
        let h = text_input(&mut ctx, 16).unwrap();

        for c in "abc".chars() {
            send_key(&mut ctx, h, c as u32, c);
        }
        assert_eq!(ctx.nodes[&h].text, "abc");
        assert_eq!(ctx.nodes[&h].cursor, 3);

        send_key(&mut ctx, h, key::LEFT, '\0');
        send_key(&mut ctx, h, 'X' as u32, 'X');
        assert_eq!(ctx.nodes[&h].text, "abXc");
        assert_eq!(ctx.nodes[&h].cursor, 3);
    }

    #[test]
    fn test_text_input_backspace_and_delete() {
        let mut ctx = test_ctx();
        let h = text_input(&mut ctx, 16).unwrap();
        for c in "abcd".chars() {
            send_key(&mut ctx, h, c as u32, c);
        }

        send_key(&mut ctx, h, key::BACKSPACE, '\0');
        assert_eq!(ctx.nodes[&h].text, "abc");

        send_key(&mut ctx, h, key::HOME, '\0');
        send_key(&mut ctx, h, key::DELETE, '\0');
        assert_eq!(ctx.nodes[&h].text, "bc");
        assert_eq!(ctx.nodes[&h].cursor, 0);

        // Backspace at the start is consumed but edits nothing
        assert_eq!(send_key(&mut ctx, h, key::BACKSPACE, '\0'), Reply::Consumed);
        assert_eq!(ctx.nodes[&h].text, "bc");
    }

    #[test]
    fn test_text_input_multibyte_editing() {
        let mut ctx = test_ctx();
        let h = text_input(&mut ctx, 16).unwrap();
        for c in ['é', 'b'] {
            send_key(&mut ctx, h, c as u32, c);
        }
        assert_eq!(ctx.nodes[&h].text, "éb");

        send_key(&mut ctx, h, key::LEFT, '\0');
        send_key(&mut ctx, h, key::BACKSPACE, '\0');
        assert_eq!(ctx.nodes[&h].text, "b");
        assert_eq!(ctx.nodes[&h].cursor, 0);
    }

    #[test]
    fn test_text_input_cursor_cell_inverted_when_focused() {
        let mut ctx = test_ctx();
        let h = text_input(&mut ctx, 10).unwrap();
        ctx.nodes.get_mut(&h).unwrap().bounds = Rect::new(0, 0, 10, 1);
        for c in "hi".chars() {
            send_key(&mut ctx, h, c as u32, c);
        }
        send_key(&mut ctx, h, key::HOME, '\0');
        ctx.focused = Some(h);

        gateway::invoke(&mut ctx, h, Capability::Render, InvokeArgs::default());

        let cell = ctx.back_buffer.get(0, 0).unwrap();
        assert_eq!(cell.ch, 'h');
        assert!(cell.attrs.contains(CellAttrs::REVERSE));
        let plain = ctx.back_buffer.get(1, 0).unwrap();
        assert!(!plain.attrs.contains(CellAttrs::REVERSE));
    }

    #[test]
    fn test_text_input_cursor_at_end_renders_space() {
        let mut ctx = test_ctx();
        let h = text_input(&mut ctx, 10).unwrap();
        ctx.nodes.get_mut(&h).unwrap().bounds = Rect::new(0, 0, 10, 1);
        for c in "hi".chars() {
            send_key(&mut ctx, h, c as u32, c);
        }
        ctx.focused = Some(h);

        gateway::invoke(&mut ctx, h, Capability::Render, InvokeArgs::default());

        let cell = ctx.back_buffer.get(2, 0).unwrap();
        assert_eq!(cell.ch, ' ');
        assert!(cell.attrs.contains(CellAttrs::REVERSE));
    }
}
