//! Crossterm-backed render surface.
//!
//! The terminal is switched to raw mode and the alternate screen on
//! construction and restored by [`TerminalSurface::shutdown`] or on drop,
//! whichever comes first. Every frame is written inside a synchronized update
//! so terminals that support it never show a half-drawn screen.

use std::io::{self, BufWriter, Stdout, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, queue, style, terminal};
use log::{debug, info, warn};

use super::{ColorSupport, Frame, RenderSurface};
use crate::error::InitError;
use crate::ui::{Command, InputEvent};
use crate::visual::Rgb;

pub struct TerminalSurface {
    out: BufWriter<Stdout>,
    size: (u16, u16),
    color: ColorSupport,
    active: bool,
}

impl TerminalSurface {
    pub fn init() -> Result<Self, InitError> {
        let color = ColorSupport::detect();
        terminal::enable_raw_mode()?;

        // From here on a failed step still restores the terminal through Drop.
        let mut surface = Self {
            out: BufWriter::with_capacity(1 << 16, io::stdout()),
            size: (0, 0),
            color,
            active: true,
        };
        execute!(
            surface.out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All)
        )?;
        surface.size = terminal::size()?;

        info!(
            "Terminal ready: {}x{}, color {:?}",
            surface.size.0, surface.size.1, surface.color
        );
        Ok(surface)
    }
}

/// Crossterm color for `rgb` at the given capability.
pub fn terminal_color(rgb: Rgb, support: ColorSupport) -> style::Color {
    match support {
        ColorSupport::TrueColor => style::Color::Rgb {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
        },
        _ => style::Color::AnsiValue(rgb.to_ansi256()),
    }
}

impl RenderSurface for TerminalSurface {
    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn color_support(&self) -> ColorSupport {
        self.color
    }

    fn present(&mut self, frame: &Frame) -> io::Result<()> {
        queue!(self.out, terminal::BeginSynchronizedUpdate, style::ResetColor)?;

        let mut current: Option<Rgb> = None;
        for y in 0..frame.height() {
            queue!(self.out, cursor::MoveTo(0, y))?;
            for cell in frame.row(y) {
                let fg = if self.color.has_color() { cell.fg } else { None };
                if fg != current {
                    match fg {
                        Some(rgb) => {
                            let color = terminal_color(rgb, self.color);
                            queue!(self.out, style::SetForegroundColor(color))?
                        }
                        None => queue!(self.out, style::ResetColor)?,
                    }
                    current = fg;
                }
                queue!(self.out, style::Print(cell.glyph))?;
            }
        }

        queue!(self.out, style::ResetColor, terminal::EndSynchronizedUpdate)?;
        self.out.flush()
    }

    fn poll_input(&mut self) -> io::Result<Option<InputEvent>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(command_for_key(&key).map(InputEvent::Command)),
            Event::Resize(cols, rows) => {
                debug!("Terminal resized to {}x{}", cols, rows);
                self.size = (cols, rows);
                Ok(Some(InputEvent::Resize { cols, rows }))
            }
            _ => Ok(None),
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let restored = execute!(
            self.out,
            style::ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        terminal::disable_raw_mode()?;
        restored
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Map a key press to a command. Releases and repeats of other kinds are ignored.
pub fn command_for_key(key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Command::Quit);
    }

    let command = match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Command::Quit,
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => Command::SmoothingUp,
        KeyCode::Char('-') | KeyCode::Down => Command::SmoothingDown,
        KeyCode::Char(']') | KeyCode::Right => Command::GainUp,
        KeyCode::Char('[') | KeyCode::Left => Command::GainDown,
        KeyCode::Char('.') => Command::HoldUp,
        KeyCode::Char(',') => Command::HoldDown,
        KeyCode::Char('c') => Command::CycleColormap,
        KeyCode::Char('w') => Command::ToggleWaterfall,
        KeyCode::Char('s') => Command::ToggleStats,
        KeyCode::Char('?') | KeyCode::Char('h') => Command::ToggleHelp,
        _ => return None,
    };
    Some(command)
}
