//! Shared types, enums, and constants.
//!
//! Value types that cross module boundaries live here: cells, buffers,
//! colors, node kinds, and input events.

use bitflags::bitflags;

// ============================================================================
// Node Kinds
// ============================================================================

/// What a node in the component tree is. Panels own children and a layout
/// strategy; everything else is a leaf widget whose behavior lives in its
/// capability slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Panel,
    Screen,
    Label,
    Button,
    TextInput,
    Custom(&'static str),
}

impl NodeKind {
    /// Whether this kind may own children.
    pub fn is_panel(self) -> bool {
        matches!(self, Self::Panel | Self::Screen)
    }

    /// Short name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Panel => "panel",
            Self::Screen => "screen",
            Self::Label => "label",
            Self::Button => "button",
            Self::TextInput => "text_input",
            Self::Custom(name) => name,
        }
    }
}

// ============================================================================
// Color Encoding (u32)
// ============================================================================
//
// Bits 31-24: Mode tag
//   0x00 = Default (terminal default)
//   0x01 = RGB truecolor (bits 23-0 = 0xRRGGBB)
//   0x02 = Indexed (bits 7-0 = palette index 0-255)

pub const COLOR_DEFAULT: u32 = 0x0000_0000;

/// Encode an RGB truecolor value.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    0x0100_0000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Encode a 256-palette indexed color.
pub fn indexed(index: u8) -> u32 {
    0x0200_0000 | index as u32
}

pub fn color_tag(color: u32) -> u8 {
    ((color >> 24) & 0xFF) as u8
}

pub fn color_to_crossterm(color: u32) -> Option<crossterm::style::Color> {
    match color_tag(color) {
        0x00 => None, // Default — no override
        0x01 => {
            let r = ((color >> 16) & 0xFF) as u8;
            let g = ((color >> 8) & 0xFF) as u8;
            let b = (color & 0xFF) as u8;
            Some(crossterm::style::Color::Rgb { r, g, b })
        }
        0x02 => {
            let index = (color & 0xFF) as u8;
            Some(crossterm::style::Color::AnsiValue(index))
        }
        _ => None, // Invalid tag — treat as Default
    }
}

// ============================================================================
// Border Style
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Single,
    Double,
    Rounded,
    Bold,
}

impl BorderStyle {
    /// Border thickness in cells per side.
    pub fn thickness(self) -> u16 {
        if self == Self::None {
            0
        } else {
            1
        }
    }

    /// Returns the border characters: (top-left, top-right, bottom-left,
    /// bottom-right, horizontal, vertical).
    pub fn chars(self) -> Option<(char, char, char, char, char, char)> {
        match self {
            Self::None => None,
            Self::Single => Some(('┌', '┐', '└', '┘', '─', '│')),
            Self::Double => Some(('╔', '╗', '╚', '╝', '═', '║')),
            Self::Rounded => Some(('╭', '╮', '╰', '╯', '─', '│')),
            Self::Bold => Some(('┏', '┓', '┗', '┛', '━', '┃')),
        }
    }
}

// ============================================================================
// Cell Attributes (bitflags)
// ============================================================================

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellAttrs: u8 {
        const BOLD          = 0b0000_0001;
        const ITALIC        = 0b0000_0010;
        const UNDERLINE     = 0b0000_0100;
        const DIM           = 0b0000_1000;
        const REVERSE       = 0b0001_0000;
        const STRIKETHROUGH = 0b0010_0000;
    }
}

// ============================================================================
// Cell & Buffer
// ============================================================================

/// One terminal character position: glyph plus style. A plain value type;
/// identity is the buffer position holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: u32,
    pub bg: u32,
    pub attrs: CellAttrs,
}

impl Cell {
    pub const BLANK: Cell = Cell {
        ch: ' ',
        fg: COLOR_DEFAULT,
        bg: COLOR_DEFAULT,
        attrs: CellAttrs::empty(),
    };

    /// Overwrite this cell's fields from another, in place. The present
    /// pass uses this to sync front to back without replacing cells.
    pub fn assign_from(&mut self, other: &Cell) {
        self.ch = other.ch;
        self.fg = other.fg;
        self.bg = other.bg;
        self.attrs = other.attrs;
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

/// A width×height grid of cells, row-major. Two live instances per render
/// surface (front = last presented, back = pending writes); both always
/// share dimensions, and `resize` replaces storage for both atomically at
/// the context level.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
}

impl Buffer {
    pub fn new(width: u16, height: u16) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; size],
        }
    }

    /// Reallocate to new dimensions and clear. The only operation that
    /// touches cell storage capacity; everything else mutates in place.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let size = (width as usize) * (height as usize);
        self.cells.resize(size, Cell::BLANK);
        self.clear();
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.assign_from(&Cell::BLANK);
        }
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if x < self.width && y < self.height {
            Some(&self.cells[(y as usize) * (self.width as usize) + (x as usize)])
        } else {
            None
        }
    }

    /// Write a full cell. Out-of-bounds writes are silently clipped —
    /// partial off-screen content is expected during overflow layouts.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[(y as usize) * (self.width as usize) + (x as usize)].assign_from(&cell);
        }
    }

    /// Write glyph + style fields in place without constructing a Cell at
    /// the call site.
    pub fn put(&mut self, x: u16, y: u16, ch: char, fg: u32, bg: u32, attrs: CellAttrs) {
        if x < self.width && y < self.height {
            let cell = &mut self.cells[(y as usize) * (self.width as usize) + (x as usize)];
            cell.ch = ch;
            cell.fg = fg;
            cell.bg = bg;
            cell.attrs = attrs;
        }
    }
}

// ============================================================================
// Cell Update (for TerminalBackend)
// ============================================================================

/// One positioned cell write, as emitted by the diff pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

// ============================================================================
// Input Events
// ============================================================================

/// Decoded input event as delivered by a TerminalBackend. Widget handlers
/// receive these through the invocation gateway's HandleInput capability.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key {
        code: u32,
        modifiers: u32,
        character: char,
    },
    Mouse {
        x: u16,
        y: u16,
        button: u8,
        modifiers: u32,
    },
    Resize {
        width: u16,
        height: u16,
    },
    FocusGained,
    FocusLost,
}

// ============================================================================
// Key Code Constants
// ============================================================================

pub mod key {
    pub const BACKSPACE: u32 = 0x0100;
    pub const ENTER: u32 = 0x0101;
    pub const LEFT: u32 = 0x0102;
    pub const RIGHT: u32 = 0x0103;
    pub const UP: u32 = 0x0104;
    pub const DOWN: u32 = 0x0105;
    pub const HOME: u32 = 0x0106;
    pub const END: u32 = 0x0107;
    pub const PAGE_UP: u32 = 0x0108;
    pub const PAGE_DOWN: u32 = 0x0109;
    pub const TAB: u32 = 0x010A;
    pub const BACK_TAB: u32 = 0x010B;
    pub const DELETE: u32 = 0x010C;
    pub const INSERT: u32 = 0x010D;
    pub const ESCAPE: u32 = 0x010E;
    pub const F1: u32 = 0x0110;
}

pub mod modifier {
    pub const SHIFT: u32 = 0x01;
    pub const CTRL: u32 = 0x02;
    pub const ALT: u32 = 0x04;
    pub const SUPER: u32 = 0x08;
}
