use crate::palette::Rgb;
use crate::panel::PanelRow;
use crate::surface::{PixelSurface, Surface};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Columns reserved on the left for the control panel.
pub(crate) const PANEL_WIDTH: u16 = 30;

const UPPER_HALF: char = '▀';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                bg,
                ..Cell::default()
            };
        }
    }
}

fn color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// Canvas area in half-block pixels: everything right of the panel, above
/// the footer row.
pub(crate) fn canvas_viewport(cols: u16, rows: u16) -> (u32, u32) {
    let w = cols.saturating_sub(PANEL_WIDTH) as u32;
    let h = rows.saturating_sub(1) as u32 * 2;
    (w, h)
}

/// Draws the surface centred in the canvas area, two pixels per cell.
pub(crate) fn blit_surface(buf: &mut CellBuffer, surface: &PixelSurface, bg: Color) {
    let (sw, sh) = surface.size();
    let (vw, vh) = canvas_viewport(buf.w, buf.h);
    let x0 = PANEL_WIDTH as u32 + vw.saturating_sub(sw) / 2;
    let y0 = vh.saturating_sub(sh) / 4;

    for cy in 0..sh.div_ceil(2) {
        for cx in 0..sw {
            let Some(top) = surface.sample(cx, cy * 2) else {
                continue;
            };
            let bottom = surface.sample(cx, cy * 2 + 1).map(color).unwrap_or(bg);
            let (x, y) = (x0 + cx, y0 + cy);
            if x > u16::MAX as u32 || y > u16::MAX as u32 {
                continue;
            }
            buf.set(
                x as u16,
                y as u16,
                Cell {
                    ch: UPPER_HALF,
                    fg: color(top),
                    bg: bottom,
                },
            );
        }
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

pub(crate) fn draw_panel(buf: &mut CellBuffer, rows: &[PanelRow], status: &str) {
    let bg = Color::Black;
    let fg = Color::White;
    let hi = Color::Yellow;
    let dim = Color::DarkGrey;
    let width = PANEL_WIDTH.min(buf.w) as usize;

    draw_text(buf, 1, 0, "Kawano", fg, bg);
    for (i, row) in rows.iter().enumerate() {
        let y = 2 + i as u16;
        let marker = if row.selected { '>' } else { ' ' };
        let line = format!("{marker} {:<12}{:>11}", row.label, row.value);
        let line: String = line.chars().take(width.saturating_sub(4)).collect();
        let text_fg = match (row.selected, row.enabled) {
            (_, false) => dim,
            (true, true) => hi,
            (false, true) => fg,
        };
        draw_text(buf, 0, y, &line, text_fg, bg);
        if let Some(c) = row.swatch {
            let sx = width.saturating_sub(3) as u16;
            draw_text(buf, sx, y, "██", color(c), bg);
        }
    }

    let status_y = 3 + rows.len() as u16;
    let status: String = status.chars().take(width.saturating_sub(1)).collect();
    draw_text(buf, 1, status_y, &status, fg, bg);

    let help = "↑↓ select  ←→ adjust  enter press  s shuffle  d download  q quit";
    draw_text(buf, 1, buf.h.saturating_sub(1), help, dim, bg);
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    /// Writes the cells that differ from the last frame.
    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_pos: Option<(u16, u16)> = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                if last_pos != Some((x.wrapping_sub(1), y)) {
                    queue!(self.out, cursor::MoveTo(x, y))?;
                }
                last_pos = Some((x, y));

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}
