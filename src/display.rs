use std::io;
use std::sync::{Arc, PoisonError, RwLock};
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// one frame's worth of pixels, indexed `[row][col]`
pub type Pixels = [[bool; SCREEN_WIDTH]; SCREEN_HEIGHT];

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work. Callers keep `col < 64` and `row < 32`.
pub trait Display {
    /// turn every pixel off
    fn clear(&mut self);

    fn is_pixel_set(&self, col: usize, row: usize) -> bool;

    fn set_pixel(&mut self, col: usize, row: usize, on: bool);
}

/// A 64x32 monochrome framebuffer shared between the interpreter (the only
/// writer) and whatever renders it. Clones share the same pixels.
#[derive(Clone)]
pub struct Framebuffer {
    pixels: Arc<RwLock<Pixels>>,
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: Arc::new(RwLock::new([[false; SCREEN_WIDTH]; SCREEN_HEIGHT])),
        }
    }

    /// copy of the current frame for rendering
    pub fn snapshot(&self) -> Pixels {
        *self.pixels.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Framebuffer {
    fn clear(&mut self) {
        *self.pixels.write().unwrap_or_else(PoisonError::into_inner) =
            [[false; SCREEN_WIDTH]; SCREEN_HEIGHT];
    }

    fn is_pixel_set(&self, col: usize, row: usize) -> bool {
        self.pixels.read().unwrap_or_else(PoisonError::into_inner)[row][col]
    }

    fn set_pixel(&mut self, col: usize, row: usize, on: bool) {
        self.pixels.write().unwrap_or_else(PoisonError::into_inner)[row][col] = on;
    }
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel whose state is `lit`
    fn points_from_pixels<'a>(
        &self,
        pixels: &'a Pixels,
        lit: bool,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        pixels.iter().enumerate().flat_map(move |(row, cols)| {
            cols.iter()
                .enumerate()
                .filter(move |(_, on)| **on == lit)
                .map(move |(col, _)| (col as f64, -1.0 * row as f64))
        })
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(SCREEN_WIDTH, SCREEN_HEIGHT),
        })
    }

    /// render one frame
    pub fn draw(&mut self, pixels: &Pixels) -> Result<(), io::Error> {
        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        let resolution = &self.resolution;
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &resolution.points_from_pixels(pixels, false).collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &resolution.points_from_pixels(pixels, true).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Resolution tests
    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_points_split_by_state() {
        let r = Resolution(64, 32);
        let mut pixels = [[false; SCREEN_WIDTH]; SCREEN_HEIGHT];
        pixels[2][5] = true;
        let lit: Vec<_> = r.points_from_pixels(&pixels, true).collect();
        assert_eq!(lit, vec![(5.0, -2.0)]);
        assert_eq!(r.points_from_pixels(&pixels, false).count(), 2047);
    }

    // Framebuffer tests
    #[test]
    fn test_framebuffer_starts_clear() {
        let fb = Framebuffer::new();
        assert!(fb.snapshot().iter().flatten().all(|on| !on));
    }

    #[test]
    fn test_framebuffer_set_and_clear() {
        let mut fb = Framebuffer::new();
        fb.set_pixel(63, 31, true);
        assert!(fb.is_pixel_set(63, 31));
        assert!(!fb.is_pixel_set(0, 0));
        fb.clear();
        assert!(!fb.is_pixel_set(63, 31));
    }

    #[test]
    fn test_framebuffer_clones_share_pixels() {
        let mut writer = Framebuffer::new();
        let reader = writer.clone();
        writer.set_pixel(1, 2, true);
        assert!(reader.snapshot()[2][1]);
    }

    #[test]
    #[should_panic]
    fn test_framebuffer_rejects_out_of_range() {
        let mut fb = Framebuffer::new();
        fb.set_pixel(64, 0, true);
    }
}
