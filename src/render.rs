use crate::model::{Emphasis, Mood, Notice, StatusView};
use crossterm::{
    cursor, execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
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

    #[cfg(test)]
    fn row_text(&self, y: u16) -> String {
        (0..self.w).map(|x| self.cells[self.idx(x, y)].ch).collect()
    }
}

/// Alternate-screen session. Frames are drawn into `cur`; `present` writes
/// only the rows that differ from what is already on screen.
pub(crate) struct Terminal {
    out: io::Stdout,
    shown: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, cursor::Hide, DisableLineWrap)?;
        let (cols, rows) = terminal::size()?;
        let mut term = Self {
            out,
            shown: CellBuffer::new(0, 0),
            cur: CellBuffer::new(cols, rows),
        };
        term.invalidate(cols, rows)?;
        Ok(term)
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        execute!(
            self.out,
            SetAttribute(Attribute::Reset),
            ResetColor,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Picks up a new window size; the next `present` repaints everything.
    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<()> {
        let (cols, rows) = terminal::size()?;
        if cols != self.cur.w || rows != self.cur.h {
            self.cur = CellBuffer::new(cols, rows);
            self.invalidate(cols, rows)?;
        }
        Ok(())
    }

    fn invalidate(&mut self, cols: u16, rows: u16) -> anyhow::Result<()> {
        // a sentinel glyph no frame ever draws forces every row dirty
        self.shown = CellBuffer::new(cols, rows);
        for c in &mut self.shown.cells {
            c.ch = '\0';
        }
        queue!(self.out, Clear(ClearType::All))?;
        Ok(())
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        let w = self.cur.w as usize;
        queue!(self.out, BeginSynchronizedUpdate)?;

        for (y, (row, old)) in self
            .cur
            .cells
            .chunks(w.max(1))
            .zip(self.shown.cells.chunks(w.max(1)))
            .enumerate()
        {
            if row == old {
                continue;
            }
            queue!(self.out, cursor::MoveTo(0, y as u16))?;
            for (style, text) in style_runs(row) {
                let weight = if style.bold {
                    Attribute::Bold
                } else {
                    Attribute::NormalIntensity
                };
                queue!(
                    self.out,
                    SetAttribute(weight),
                    SetForegroundColor(style.fg),
                    SetBackgroundColor(style.bg),
                    Print(text)
                )?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.shown.cells.clone_from(&self.cur.cells);
        Ok(())
    }
}

/// Splits a row into stretches that share colours and weight.
fn style_runs(row: &[Cell]) -> Vec<(Cell, String)> {
    let mut runs: Vec<(Cell, String)> = Vec::new();
    for c in row {
        match runs.last_mut() {
            Some((style, text)) if (style.fg, style.bg, style.bold) == (c.fg, c.bg, c.bold) => {
                text.push(c.ch)
            }
            _ => runs.push((*c, c.ch.to_string())),
        }
    }
    runs
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    draw_text_styled(buf, x, y, s, fg, bg, false);
}

fn draw_text_styled(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color, bold: bool) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg, bold });
    }
}

fn bar(value: u8, width: usize) -> String {
    let fill = (value.min(100) as usize * width + 50) / 100;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { '·' });
    }
    s.push(']');
    s
}

/// Colour for a vital; `inverted` is for hunger where high is bad.
fn vital_color(value: u8, inverted: bool, enable_color: bool) -> Color {
    if !enable_color {
        return Color::White;
    }
    let goodness = if inverted { 100 - value.min(100) } else { value };
    match goodness {
        0..=25 => Color::Red,
        26..=50 => Color::Yellow,
        _ => Color::Green,
    }
}

fn emphasis_color(emphasis: Option<Emphasis>, enable_color: bool) -> Color {
    match (emphasis, enable_color) {
        (Some(Emphasis::Positive), true) => Color::Green,
        (Some(Emphasis::Negative), true) => Color::Red,
        _ => Color::White,
    }
}

pub(crate) struct Frame<'a> {
    pub(crate) view: &'a StatusView,
    pub(crate) notice: Option<&'a Notice>,
    pub(crate) help_open: bool,
    pub(crate) enable_color: bool,
}

/// Draws the whole screen for one frame into `buf`.
pub(crate) fn draw_frame(buf: &mut CellBuffer, frame: &Frame<'_>) {
    let bg = Color::Black;
    buf.clear(bg);

    let flash = frame.notice.and_then(|n| n.emphasis);
    draw_border(buf, emphasis_color(flash, frame.enable_color));
    draw_status(buf, frame);

    let panel_w = 34i32;
    let cx = panel_w + (buf.w as i32 - panel_w) / 2;
    let cy = buf.h as i32 / 2;
    draw_pet_face(buf, frame.view, cx, cy);

    let help = "f feed | p play | s sleep | h heal | space pause | r reset | ? help | q quit";
    draw_text(buf, 2, buf.h.saturating_sub(2), help, Color::DarkGrey, bg);

    if frame.help_open {
        draw_help(buf);
    }
}

fn draw_status(buf: &mut CellBuffer, frame: &Frame<'_>) {
    let bg = Color::Black;
    let fg = Color::White;
    let v = frame.view;

    draw_text_styled(buf, 2, 1, "PocketPet", fg, bg, true);
    draw_text(buf, 2, 2, &format!("Age: {} min", v.age_minutes), fg, bg);

    let rows = [
        ("Health", v.health, false),
        ("Hunger", v.hunger, true),
        ("Energy", v.energy, false),
        ("Clean ", v.clean, false),
    ];
    for (i, (name, val, inverted)) in rows.iter().enumerate() {
        let line = format!("{name} {} {:>3}", bar(*val, 16), val);
        let color = vital_color(*val, *inverted, frame.enable_color);
        draw_text(buf, 2, 4 + i as u16, &line, color, bg);
    }

    draw_text(buf, 2, 9, &format!("Mood: {}", v.mood.label()), fg, bg);
    draw_text(buf, 2, 10, &format!("      {}", v.condition), fg, bg);

    let mut badges = Vec::new();
    if v.is_sleeping {
        badges.push("[Sleeping]");
    }
    if v.paused {
        badges.push("[Paused]");
    }
    if v.needs_reset {
        badges.push("[Needs reset]");
    }
    draw_text(buf, 2, 12, &badges.join(" "), Color::Cyan, bg);

    if let Some(n) = frame.notice {
        let color = emphasis_color(n.emphasis, frame.enable_color);
        draw_text_styled(buf, 2, 14, &n.text, color, bg, n.emphasis.is_some());
    }
}

fn draw_border(buf: &mut CellBuffer, fg: Color) {
    if buf.w < 2 || buf.h < 2 {
        return;
    }
    let bg = Color::Black;
    let cell = |ch| Cell {
        ch,
        fg,
        bg,
        bold: false,
    };
    let (r, b) = (buf.w - 1, buf.h - 1);
    for x in 1..r {
        buf.set(x, 0, cell('─'));
        buf.set(x, b, cell('─'));
    }
    for y in 1..b {
        buf.set(0, y, cell('│'));
        buf.set(r, y, cell('│'));
    }
    buf.set(0, 0, cell('┌'));
    buf.set(r, 0, cell('┐'));
    buf.set(0, b, cell('└'));
    buf.set(r, b, cell('┘'));
}

fn pet_face(view: &StatusView) -> [&'static str; 7] {
    let eyes = if view.needs_reset {
        "   |   x   x   | "
    } else if view.is_sleeping {
        "   |   -   -   | "
    } else {
        "   |   o   o   | "
    };
    let mouth = if view.needs_reset {
        "   |    ___    | "
    } else {
        match view.mood {
            Mood::Happy => "   |   \\___/   | ",
            Mood::Okay => "   |    ___    | ",
            Mood::Sleepy => "   |     o     | ",
            Mood::Hungry => "   |    (O)    | ",
            Mood::Sick => "   |   /~~~\\   | ",
        }
    };
    [
        "     _______     ",
        "    /       \\    ",
        eyes,
        "   |    ^      | ",
        mouth,
        "    \\_______/    ",
        "                 ",
    ]
}

fn draw_pet_face(buf: &mut CellBuffer, view: &StatusView, cx: i32, cy: i32) {
    let bg = Color::Black;
    let fg = Color::White;
    let grid = pet_face(view);

    let w = grid[0].chars().count() as i32;
    let x0 = cx - w / 2;
    let y0 = cy - grid.len() as i32 / 2;

    for (yy, line) in grid.iter().enumerate() {
        let y = y0 + yy as i32;
        if y < 0 || y >= buf.h as i32 {
            continue;
        }
        for (xx, ch) in line.chars().enumerate() {
            let x = x0 + xx as i32;
            if x >= 0 && x < buf.w as i32 {
                buf.set(
                    x as u16,
                    y as u16,
                    Cell {
                        ch,
                        fg,
                        bg,
                        bold: false,
                    },
                );
            }
        }
    }

    if view.is_sleeping {
        let (zx, zy) = (x0 + w, y0 - 1);
        if zx >= 0 && zy >= 0 {
            draw_text(buf, zx as u16, zy as u16, "z Z", Color::Cyan, bg);
        }
    }
}

fn draw_help(buf: &mut CellBuffer) {
    let body = [
        "Keep your pet fed, rested, and clean.",
        "",
        "f  Feed     less hunger, a bit messier",
        "p  Play     costs energy, makes it hungry",
        "s  Sleep    toggle rest to recover energy",
        "h  Heal     restores health, costs energy",
        "space       pause or resume time",
        "r  Reset    start over with a new pet",
        "",
        "Time keeps passing while you are away,",
        "up to an hour of it.",
        "",
        "? or Esc to close",
    ];
    let bw = 46u16.min(buf.w.saturating_sub(2));
    let bh = (body.len() as u16 + 4).min(buf.h.saturating_sub(2));
    if bw < 4 || bh < 4 {
        return;
    }
    let x0 = (buf.w - bw) / 2;
    let y0 = (buf.h - bh) / 2;
    let bg = Color::Black;

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            buf.set(x, y, Cell { bg, ..Cell::default() });
        }
    }
    for x in x0..x0 + bw {
        draw_text(buf, x, y0, "─", Color::White, bg);
        draw_text(buf, x, y0 + bh - 1, "─", Color::White, bg);
    }
    draw_text_styled(buf, x0 + 2, y0 + 1, "How to play", Color::White, bg, true);
    for (i, line) in body.iter().enumerate() {
        let y = y0 + 3 + i as u16;
        if y >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, y, line, Color::White, bg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> StatusView {
        StatusView {
            health: 100,
            hunger: 0,
            energy: 80,
            clean: 80,
            is_sleeping: false,
            paused: false,
            needs_reset: false,
            mood: Mood::Happy,
            condition: "Great",
            age_minutes: 7,
        }
    }

    #[test]
    fn rows_are_written_in_style_runs() {
        let mut buf = CellBuffer::new(8, 1);
        draw_text(&mut buf, 0, 0, "ab", Color::Red, Color::Black);
        draw_text(&mut buf, 2, 0, "cd", Color::Green, Color::Black);
        let runs = style_runs(&buf.cells);
        let texts: Vec<&str> = runs.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, ["ab", "cd", "    "]);
        assert_eq!(runs[1].0.fg, Color::Green);
        assert!(style_runs(&[]).is_empty());
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar(0, 4), "[····]");
        assert_eq!(bar(50, 4), "[██··]");
        assert_eq!(bar(100, 4), "[████]");
    }

    #[test]
    fn hunger_colour_is_inverted() {
        assert_eq!(vital_color(90, true, true), Color::Red);
        assert_eq!(vital_color(90, false, true), Color::Green);
        assert_eq!(vital_color(90, true, false), Color::White);
    }

    #[test]
    fn frame_shows_status_and_notice() {
        let mut buf = CellBuffer::new(100, 30);
        let v = view();
        let notice = Notice::negative("Too tired to play...");
        draw_frame(
            &mut buf,
            &Frame {
                view: &v,
                notice: Some(&notice),
                help_open: false,
                enable_color: true,
            },
        );
        assert!(buf.row_text(2).contains("Age: 7 min"));
        assert!(buf.row_text(9).contains("Mood: Happy"));
        assert!(buf.row_text(10).contains("Great"));
        assert!(buf.row_text(14).contains("Too tired to play..."));
        // negative notices flash the border red
        assert_eq!(buf.cells[buf.idx(0, 0)].fg, Color::Red);
    }

    #[test]
    fn badges_reflect_flags() {
        let mut buf = CellBuffer::new(100, 30);
        let v = StatusView {
            paused: true,
            needs_reset: true,
            health: 0,
            ..view()
        };
        draw_frame(
            &mut buf,
            &Frame {
                view: &v,
                notice: None,
                help_open: false,
                enable_color: false,
            },
        );
        let row = buf.row_text(12);
        assert!(row.contains("[Paused]"));
        assert!(row.contains("[Needs reset]"));
        assert!(!row.contains("[Sleeping]"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut buf = CellBuffer::new(3, 2);
        let v = view();
        draw_frame(
            &mut buf,
            &Frame {
                view: &v,
                notice: None,
                help_open: true,
                enable_color: true,
            },
        );
    }
}
