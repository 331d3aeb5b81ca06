pub mod terminal;

pub use terminal::TerminalSurface;

use std::io;

use crate::ui::InputEvent;
use crate::visual::Rgb;

/// One character cell of a composed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    /// Foreground color; `None` draws with the terminal default.
    pub fg: Option<Rgb>,
}

impl Cell {
    pub const BLANK: Cell = Cell { glyph: ' ', fg: None };

    pub fn new(glyph: char, fg: Option<Rgb>) -> Self {
        Self { glyph, fg }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

/// A full screen of cells, row-major, origin at the top left.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Frame {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Write one cell; positions outside the frame are ignored.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = cell;
        }
    }

    /// Write `text` starting at `(x, y)`, clipped at the right edge.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, fg: Option<Rgb>) {
        if y >= self.height {
            return;
        }
        for (offset, glyph) in text.chars().enumerate() {
            let Some(column) = x.checked_add(offset as u16).filter(|&c| c < self.width) else {
                break;
            };
            self.set(column, y, Cell::new(glyph, fg));
        }
    }

    pub fn row(&self, y: u16) -> &[Cell] {
        match self.index(0, y) {
            Some(start) => &self.cells[start..start + self.width as usize],
            None => &[],
        }
    }

    /// The glyphs of row `y` as a string, mostly for tests and logging.
    pub fn row_text(&self, y: u16) -> String {
        self.row(y).iter().map(|c| c.glyph).collect()
    }
}

/// Color capability of the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSupport {
    TrueColor,
    Ansi256,
    None,
}

impl ColorSupport {
    pub fn has_color(self) -> bool {
        self != ColorSupport::None
    }

    /// Detect from `NO_COLOR`, `TERM` and `COLORTERM`.
    pub fn detect() -> Self {
        Self::from_env(
            std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()),
            std::env::var("TERM").ok().as_deref(),
            std::env::var("COLORTERM").ok().as_deref(),
        )
    }

    pub fn from_env(no_color: bool, term: Option<&str>, colorterm: Option<&str>) -> Self {
        if no_color || matches!(term, None | Some("") | Some("dumb")) {
            return ColorSupport::None;
        }
        match colorterm.map(str::to_ascii_lowercase).as_deref() {
            Some("truecolor") | Some("24bit") => ColorSupport::TrueColor,
            _ => ColorSupport::Ansi256,
        }
    }
}

/// Where composed frames go and where input comes from.
pub trait RenderSurface {
    /// Current size in columns and rows.
    fn size(&self) -> (u16, u16);

    fn color_support(&self) -> ColorSupport;

    /// Draw a whole frame, replacing what was shown before.
    fn present(&mut self, frame: &Frame) -> io::Result<()>;

    /// Return at most one pending event without blocking.
    fn poll_input(&mut self) -> io::Result<Option<InputEvent>>;

    /// Restore the device. Idempotent.
    fn shutdown(&mut self) -> io::Result<()>;
}
