//! TerminalBackend trait + crossterm implementation.
//!
//! The render and event modules depend on this trait, not on crossterm
//! directly. The diff renderer's only side effect is the stream of
//! positioned cell writes handed to `write_diff`; escape-sequence encoding
//! stays behind this boundary. HeadlessBackend serves CI; MockBackend
//! records the diff stream and injects events for unit tests.

use crate::types::{color_to_crossterm, CellAttrs, CellUpdate, InputEvent};

// ============================================================================
// TerminalBackend Trait
// ============================================================================

pub trait TerminalBackend {
    fn init(&mut self) -> Result<(), String>;
    fn shutdown(&mut self) -> Result<(), String>;
    fn size(&self) -> (u16, u16);
    fn write_diff(&mut self, diff: &[CellUpdate]) -> Result<(), String>;
    fn flush(&mut self) -> Result<(), String>;
    fn read_events(&mut self, timeout_ms: u32) -> Vec<InputEvent>;

    /// Downcast support for test code.
    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

// ============================================================================
// CrosstermBackend
// ============================================================================

pub struct CrosstermBackend {
    width: u16,
    height: u16,
}

impl CrosstermBackend {
    pub fn new() -> Self {
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        Self {
            width: w,
            height: h,
        }
    }
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBackend for CrosstermBackend {
    fn init(&mut self) -> Result<(), String> {
        use crossterm::{
            cursor,
            event::EnableMouseCapture,
            terminal::{enable_raw_mode, EnterAlternateScreen},
            ExecutableCommand,
        };

        enable_raw_mode().map_err(|e| format!("raw mode: {e}"))?;
        let mut stdout = std::io::stdout();
        stdout
            .execute(EnterAlternateScreen)
            .map_err(|e| format!("alternate screen: {e}"))?;
        stdout
            .execute(EnableMouseCapture)
            .map_err(|e| format!("mouse capture: {e}"))?;
        // Widget cursors are drawn as inverted cells in the buffer; the OS
        // cursor would bleed onto the last written cell after each diff.
        stdout
            .execute(cursor::Hide)
            .map_err(|e| format!("hide cursor: {e}"))?;

        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        self.width = w;
        self.height = h;

        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), String> {
        use crossterm::{
            cursor,
            event::DisableMouseCapture,
            terminal::{disable_raw_mode, LeaveAlternateScreen},
            ExecutableCommand,
        };

        let mut stdout = std::io::stdout();
        stdout
            .execute(cursor::Show)
            .map_err(|e| format!("show cursor: {e}"))?;
        stdout
            .execute(DisableMouseCapture)
            .map_err(|e| format!("disable mouse: {e}"))?;
        stdout
            .execute(LeaveAlternateScreen)
            .map_err(|e| format!("leave alternate screen: {e}"))?;
        disable_raw_mode().map_err(|e| format!("disable raw mode: {e}"))?;

        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        crossterm::terminal::size().unwrap_or((self.width, self.height))
    }

    fn write_diff(&mut self, diff: &[CellUpdate]) -> Result<(), String> {
        let mut stdout = std::io::stdout();
        for update in diff {
            queue_cell(&mut stdout, update)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), String> {
        use std::io::Write;
        std::io::stdout().flush().map_err(|e| format!("flush: {e}"))
    }

    fn read_events(&mut self, timeout_ms: u32) -> Vec<InputEvent> {
        use crossterm::event::{self, Event};

        let mut events = Vec::new();
        let timeout = std::time::Duration::from_millis(timeout_ms as u64);

        if event::poll(timeout).unwrap_or(false) {
            while event::poll(std::time::Duration::ZERO).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key_event)) => {
                        if let Some(ev) = decode_key(key_event) {
                            events.push(ev);
                        }
                    }
                    Ok(Event::Mouse(mouse_event)) => {
                        if let Some(ev) = decode_mouse(mouse_event) {
                            events.push(ev);
                        }
                    }
                    Ok(Event::Resize(w, h)) => {
                        self.width = w;
                        self.height = h;
                        events.push(InputEvent::Resize {
                            width: w,
                            height: h,
                        });
                    }
                    Ok(Event::FocusGained) => events.push(InputEvent::FocusGained),
                    Ok(Event::FocusLost) => events.push(InputEvent::FocusLost),
                    _ => break,
                }
            }
        }

        events
    }

    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Queue one positioned cell write: move, colors, attributes, glyph, reset.
fn queue_cell(stdout: &mut std::io::Stdout, update: &CellUpdate) -> Result<(), String> {
    use crossterm::{
        cursor::MoveTo,
        style::{Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor},
        QueueableCommand,
    };

    stdout
        .queue(MoveTo(update.x, update.y))
        .map_err(|e| format!("move: {e}"))?;

    match color_to_crossterm(update.cell.fg) {
        Some(c) => stdout.queue(SetForegroundColor(c)),
        None => stdout.queue(SetForegroundColor(Color::Reset)),
    }
    .map_err(|e| format!("fg: {e}"))?;

    match color_to_crossterm(update.cell.bg) {
        Some(c) => stdout.queue(SetBackgroundColor(c)),
        None => stdout.queue(SetBackgroundColor(Color::Reset)),
    }
    .map_err(|e| format!("bg: {e}"))?;

    let attr_pairs = [
        (CellAttrs::BOLD, Attribute::Bold),
        (CellAttrs::ITALIC, Attribute::Italic),
        (CellAttrs::UNDERLINE, Attribute::Underlined),
        (CellAttrs::DIM, Attribute::Dim),
        (CellAttrs::REVERSE, Attribute::Reverse),
        (CellAttrs::STRIKETHROUGH, Attribute::CrossedOut),
    ];
    for (flag, attr) in attr_pairs {
        if update.cell.attrs.contains(flag) {
            stdout
                .queue(SetAttribute(attr))
                .map_err(|e| format!("attr: {e}"))?;
        }
    }

    stdout
        .queue(Print(update.cell.ch))
        .map_err(|e| format!("print: {e}"))?;
    stdout
        .queue(SetAttribute(Attribute::Reset))
        .map_err(|e| format!("reset: {e}"))?;

    Ok(())
}

fn decode_key(key_event: crossterm::event::KeyEvent) -> Option<InputEvent> {
    use crate::types::key;
    use crossterm::event::{KeyCode, KeyEventKind};

    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    let (code, character) = match key_event.code {
        KeyCode::Char(c) => (c as u32, c),
        KeyCode::Backspace => (key::BACKSPACE, '\0'),
        KeyCode::Enter => (key::ENTER, '\0'),
        KeyCode::Left => (key::LEFT, '\0'),
        KeyCode::Right => (key::RIGHT, '\0'),
        KeyCode::Up => (key::UP, '\0'),
        KeyCode::Down => (key::DOWN, '\0'),
        KeyCode::Home => (key::HOME, '\0'),
        KeyCode::End => (key::END, '\0'),
        KeyCode::PageUp => (key::PAGE_UP, '\0'),
        KeyCode::PageDown => (key::PAGE_DOWN, '\0'),
        KeyCode::Tab => (key::TAB, '\0'),
        KeyCode::BackTab => (key::BACK_TAB, '\0'),
        KeyCode::Delete => (key::DELETE, '\0'),
        KeyCode::Insert => (key::INSERT, '\0'),
        KeyCode::Esc => (key::ESCAPE, '\0'),
        KeyCode::F(n) => (key::F1 + (n as u32).saturating_sub(1), '\0'),
        _ => return None,
    };

    Some(InputEvent::Key {
        code,
        modifiers: decode_modifiers(key_event.modifiers),
        character,
    })
}

fn decode_mouse(mouse_event: crossterm::event::MouseEvent) -> Option<InputEvent> {
    use crossterm::event::{MouseButton, MouseEventKind};

    let button = match mouse_event.kind {
        MouseEventKind::Down(MouseButton::Left) => 0u8,
        MouseEventKind::Down(MouseButton::Middle) => 1,
        MouseEventKind::Down(MouseButton::Right) => 2,
        MouseEventKind::ScrollUp => 3,
        MouseEventKind::ScrollDown => 4,
        _ => return None,
    };

    Some(InputEvent::Mouse {
        x: mouse_event.column,
        y: mouse_event.row,
        button,
        modifiers: decode_modifiers(mouse_event.modifiers),
    })
}

fn decode_modifiers(mods: crossterm::event::KeyModifiers) -> u32 {
    use crate::types::modifier;
    use crossterm::event::KeyModifiers;

    let mut out = 0;
    if mods.contains(KeyModifiers::SHIFT) {
        out |= modifier::SHIFT;
    }
    if mods.contains(KeyModifiers::CONTROL) {
        out |= modifier::CTRL;
    }
    if mods.contains(KeyModifiers::ALT) {
        out |= modifier::ALT;
    }
    if mods.contains(KeyModifiers::SUPER) {
        out |= modifier::SUPER;
    }
    out
}

// ============================================================================
// HeadlessBackend (CI environments, no terminal)
// ============================================================================

pub struct HeadlessBackend {
    pub width: u16,
    pub height: u16,
}

impl HeadlessBackend {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl TerminalBackend for HeadlessBackend {
    fn init(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn write_diff(&mut self, _diff: &[CellUpdate]) -> Result<(), String> {
        Ok(()) // Discard output
    }

    fn flush(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn read_events(&mut self, _timeout_ms: u32) -> Vec<InputEvent> {
        Vec::new()
    }

    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ============================================================================
// MockBackend (unit tests)
// ============================================================================

#[cfg(test)]
pub struct MockBackend {
    pub width: u16,
    pub height: u16,
    pub diff_log: Vec<CellUpdate>,
    pub flush_count: u32,
    pub injected_events: Vec<InputEvent>,
}

#[cfg(test)]
impl MockBackend {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            diff_log: Vec::new(),
            flush_count: 0,
            injected_events: Vec::new(),
        }
    }
}

#[cfg(test)]
impl TerminalBackend for MockBackend {
    fn init(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn write_diff(&mut self, diff: &[CellUpdate]) -> Result<(), String> {
        self.diff_log.extend_from_slice(diff);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), String> {
        self.flush_count += 1;
        Ok(())
    }

    fn read_events(&mut self, _timeout_ms: u32) -> Vec<InputEvent> {
        std::mem::take(&mut self.injected_events)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
