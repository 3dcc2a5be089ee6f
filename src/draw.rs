use crate::env::{Frame, FrameSink};
use crate::game::Direction;
use crate::pos::Pos;

pub type Rgba = (u8, u8, u8, u8);

const BACKGROUND: Rgba = (20, 20, 30, 255);
const CHECKER: Rgba = (25, 25, 35, 255);
const FOOD: Rgba = (220, 50, 50, 255);
const HEAD: Rgba = (100, 255, 100, 255);
const TEXT: Rgba = (230, 230, 230, 255);

/// Pixel geometry of the board. Only the window adapters need this; the simulation
/// works purely in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub cols: u32,
    pub rows: u32,
    pub cell: u32,
    /// Extra pixel rows under the board for the status line and chart.
    pub hud: u32,
}

impl Layout {
    pub fn new(cols: u32, rows: u32, cell: u32) -> Self {
        Self { cols, rows, cell, hud: 100 }
    }

    pub fn width(&self) -> u32 {
        self.cols * self.cell
    }

    pub fn height(&self) -> u32 {
        self.rows * self.cell + self.hud
    }
}

/// RGBA frame buffer with a few drawing primitives.
pub struct Canvas<'f> {
    frame: &'f mut [u8],
    layout: Layout,
}

impl<'f> Canvas<'f> {
    pub fn new(frame: &'f mut [u8], layout: Layout) -> Self {
        Self { frame, layout }
    }

    pub fn clear(&mut self, (r, g, b, a): Rgba) {
        for px in self.frame.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, a]);
        }
    }

    pub fn blend(&mut self, x: u32, y: u32, (r, g, b, a): Rgba) {
        let (w, h) = (self.layout.width(), self.layout.height());
        if x >= w || y >= h {
            return;
        }
        let idx = ((y * w + x) * 4) as usize;
        let Some(px) = self.frame.get_mut(idx..idx + 4) else {
            return;
        };
        let (a, ia) = (a as u16, 255 - a as u16);
        for (dst, src) in px.iter_mut().zip([r, g, b]) {
            *dst = ((src as u16 * a + *dst as u16 * ia) / 255) as u8;
        }
        px[3] = 255;
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, col: Rgba) {
        let x2 = (x + w).min(self.layout.width());
        let y2 = (y + h).min(self.layout.height());
        for py in y..y2 {
            for px in x..x2 {
                self.blend(px, py, col);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: u32, y: u32, w: u32, h: u32, col: Rgba) {
        if w == 0 || h == 0 {
            return;
        }
        let (x2, y2) = (x + w - 1, y + h - 1);
        for px in x..=x2 {
            self.blend(px, y, col);
            self.blend(px, y2, col);
        }
        for py in y..=y2 {
            self.blend(x, py, col);
            self.blend(x2, py, col);
        }
    }

    pub fn fill_cell(&mut self, p: Pos, col: Rgba) {
        if p.x < 0 || p.y < 0 || p.x as u32 >= self.layout.cols || p.y as u32 >= self.layout.rows {
            return;
        }
        let c = self.layout.cell;
        self.fill_rect(p.x as u32 * c, p.y as u32 * c, c, c, col);
    }

    pub fn board(&mut self) {
        self.clear(BACKGROUND);
        for y in 0..self.layout.rows as i32 {
            for x in 0..self.layout.cols as i32 {
                if (x + y) % 2 == 0 {
                    self.fill_cell(Pos::new(x, y), CHECKER);
                }
            }
        }
    }

    fn eyes(&mut self, head: Pos, dir: Direction) {
        let c = self.layout.cell;
        let (bx, by) = (head.x as u32 * c, head.y as u32 * c);
        let (near, far) = (c / 4, c - c / 4 - 1);
        let ((x1, y1), (x2, y2)) = match dir {
            Direction::Right => ((far, near), (far, far)),
            Direction::Left => ((near, near), (near, far)),
            Direction::Up => ((near, near), (far, near)),
            Direction::Down => ((near, far), (far, far)),
        };
        self.blend(bx + x1, by + y1, (0, 0, 0, 255));
        self.blend(bx + x2, by + y2, (0, 0, 0, 255));
    }

    /// Board, food and snake (bright head, body fading towards the tail).
    pub fn snake(&mut self, frame: &Frame<'_>) {
        self.board();
        self.fill_cell(frame.food, FOOD);
        for (i, &p) in frame.snake.iter().enumerate() {
            if i == 0 {
                self.fill_cell(p, HEAD);
                self.eyes(p, frame.heading);
            } else {
                let g = 200 - (i * 10).min(100) as u8;
                self.fill_cell(p, (50, g, 50, 255));
            }
        }
    }

    pub fn text(&mut self, text: &str, x: u32, y: u32, scale: u32, col: Rgba) {
        let mut cx = x;
        for ch in text.chars() {
            if let Some(rows) = glyph_5x7(ch) {
                for (ry, row) in rows.iter().enumerate() {
                    for rx in 0..5u32 {
                        if (row >> (4 - rx)) & 1 == 1 {
                            self.fill_rect(cx + rx * scale, y + ry as u32 * scale, scale, scale, col);
                        }
                    }
                }
            }
            cx += 6 * scale;
        }
    }

    /// Text centred horizontally over the board.
    pub fn banner(&mut self, text: &str, y: u32, col: Rgba) {
        let w = text.chars().count() as u32 * 12;
        let x = self.layout.width().saturating_sub(w) / 2;
        self.text(text, x, y, 2, col);
    }

    /// Bar per score, most recent on the right, scaled to the tallest visible bar.
    pub fn chart(&mut self, x: u32, y: u32, w: u32, h: u32, data: &[u32]) {
        self.stroke_rect(x, y, w, h, (200, 200, 200, 120));
        let bars = data.len().min(w as usize / 3);
        if bars == 0 || h < 3 {
            return;
        }
        let shown = &data[data.len() - bars..];
        let max = shown.iter().copied().max().unwrap_or(0);
        if max == 0 {
            return;
        }
        let bar_w = (w / bars as u32).max(2);
        for (i, &v) in shown.iter().enumerate() {
            let bh = v * (h - 2) / max;
            let bx = x + 1 + i as u32 * bar_w;
            self.fill_rect(bx, y + h - 1 - bh, bar_w - 1, bh, (120, 180, 255, 160));
        }
    }

    /// Status line under the board.
    pub fn status(&mut self, line: &str) {
        let y = self.layout.rows * self.layout.cell + 8;
        self.text(line, 8, y, 2, TEXT);
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl FrameSink for Canvas<'_> {
    fn show(&mut self, frame: &Frame<'_>) {
        self.snake(frame);
        self.status(&format!("SCORE: {}  LENGTH: {}", frame.score, frame.snake.len()));
        if !frame.alive {
            let mid = self.layout.rows * self.layout.cell / 2;
            self.banner("GAME OVER", mid.saturating_sub(20), (255, 100, 100, 255));
        }
    }
}

fn glyph_5x7(ch: char) -> Option<[u8; 7]> {
    Some(match ch.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x1E, 0x11, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x1E, 0x10, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x1E, 0x10, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0E],
        'H' => [0x11, 0x11, 0x1F, 0x11, 0x11, 0x11, 0x11],
        'I' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x1F],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x1B, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1E, 0x01, 0x01, 0x0E, 0x01, 0x01, 0x1E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ':' => [0x00, 0x04, 0x00, 0x00, 0x04, 0x00, 0x00],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ' ' => [0x00; 7],
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn pixel(buf: &[u8], layout: Layout, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * layout.width() + x) * 4) as usize;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    #[test]
    fn frame_paints_food_and_head_cells() {
        let layout = Layout::new(4, 4, 8);
        let mut buf = vec![0u8; (layout.width() * layout.height() * 4) as usize];
        let snake = VecDeque::from(vec![Pos::new(2, 1), Pos::new(1, 1)]);
        let frame = Frame {
            snake: &snake,
            food: Pos::new(0, 3),
            score: 0,
            heading: Direction::Right,
            alive: true,
        };
        Canvas::new(&mut buf, layout).show(&frame);

        assert_eq!(pixel(&buf, layout, 1, 3 * 8 + 1), [220, 50, 50, 255]);
        assert_eq!(pixel(&buf, layout, 2 * 8 + 1, 8 + 3), [100, 255, 100, 255]);
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let layout = Layout::new(2, 2, 4);
        let mut buf = vec![0u8; (layout.width() * layout.height() * 4) as usize];
        let mut canvas = Canvas::new(&mut buf, layout);
        canvas.fill_cell(Pos::new(-1, 0), FOOD);
        canvas.fill_cell(Pos::new(5, 5), FOOD);
        canvas.fill_rect(6, 0, 50, 50, FOOD);
        assert_eq!(pixel(&buf, layout, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&buf, layout, 7, 0), [220, 50, 50, 255]);
    }
}
