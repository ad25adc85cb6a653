//! Layout and drawing: header (modes, score, countdown), tile grid, status line, overlays.

use crate::app::Screen;
use crate::grid::TileView;
use crate::mode::Mode;
use crate::session::GameSession;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Tile size in terminal cells, border included.
const TILE_W: u16 = 9;
const TILE_H: u16 = 5;
const GAP_X: u16 = 1;

const HEADER_H: u16 = 6;
const FOOTER_H: u16 = 3;
const MIN_WIDTH: u16 = 40;

/// Duration of the merge flash (TachyonFX fade back from the merged colour).
const MERGE_FLASH_MS: u32 = 300;

/// Where everything goes for a given terminal area and grid shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub board: Rect,
    pub tiles: Vec<Rect>,
    pub footer: Rect,
}

fn board_size(rows: usize, columns: usize) -> (u16, u16) {
    let (rows, columns) = (rows.max(1) as u16, columns.max(1) as u16);
    let w = columns * TILE_W + (columns - 1) * GAP_X + 2;
    let h = rows * TILE_H + 2;
    (w, h)
}

/// Compute the screen layout. Tiles are listed by id (row-major).
pub fn screen_layout(area: Rect, rows: usize, columns: usize, count: usize) -> ScreenLayout {
    let (bw, bh) = board_size(rows, columns);
    let total_w = bw.max(MIN_WIDTH);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(HEADER_H),
            Constraint::Length(bh),
            Constraint::Length(FOOTER_H),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);

    let column = vert[2];
    let board = clip(
        Rect {
            x: column.x + column.width.saturating_sub(bw) / 2,
            y: column.y,
            width: bw.min(column.width),
            height: bh.min(column.height),
        },
        area,
    );
    let inner = clip(
        Rect {
            x: board.x + 1,
            y: board.y + 1,
            width: board.width.saturating_sub(2),
            height: board.height.saturating_sub(2),
        },
        area,
    );
    let columns = columns.max(1);
    let tiles = (0..count)
        .map(|id| {
            let (r, c) = ((id / columns) as u16, (id % columns) as u16);
            let x = inner.x + c * (TILE_W + GAP_X);
            let y = inner.y + r * TILE_H;
            clip(
                Rect {
                    x,
                    y,
                    width: TILE_W,
                    height: TILE_H,
                },
                inner,
            )
        })
        .collect();

    ScreenLayout {
        header: vert[1],
        board,
        tiles,
        footer: vert[3],
    }
}

fn clip(r: Rect, bounds: Rect) -> Rect {
    let x = r.x.min(bounds.x + bounds.width);
    let y = r.y.min(bounds.y + bounds.height);
    Rect {
        x,
        y,
        width: r.width.min((bounds.x + bounds.width).saturating_sub(x)),
        height: r.height.min((bounds.y + bounds.height).saturating_sub(y)),
    }
}

/// Tile under a terminal cell, if any.
pub fn tile_at(tiles: &[Rect], column: u16, row: u16) -> Option<usize> {
    tiles.iter().position(|r| {
        r.width > 0
            && r.height > 0
            && column >= r.x
            && column < r.x + r.width
            && row >= r.y
            && row < r.y + r.height
    })
}

/// Everything the renderer needs besides the frame and the effect slots.
pub struct DrawState<'a> {
    pub session: &'a GameSession,
    pub theme: &'a Theme,
    pub screen: Screen,
    pub paused: bool,
    pub cursor: usize,
    /// Pointer position while a mouse drag is in flight.
    pub pointer: Option<(u16, u16)>,
    pub status: Option<&'a str>,
    pub stuck: bool,
    /// Tile to flash (the last merge target).
    pub flash_tile: Option<usize>,
    pub no_animation: bool,
    pub now: Instant,
}

/// Draw the current screen. When a merge just happened and animations are on,
/// runs the TachyonFX flash on the merged tile and updates `merge_effect` /
/// `merge_effect_time`.
pub fn draw(
    frame: &mut Frame,
    state: &DrawState<'_>,
    merge_effect: &mut Option<Effect>,
    merge_effect_time: &mut Option<Instant>,
) {
    let area = frame.area();
    let theme = state.theme;
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());

    let session = state.session;
    let layout = screen_layout(
        area,
        session.rows(),
        session.columns(),
        session.tile_count(),
    );

    draw_header(frame, state, layout.header);
    draw_board(frame, state, &layout);
    draw_footer(frame, state, layout.footer);

    if let Some(id) = state.flash_tile {
        if !state.no_animation {
            if let Some(rect) = layout.tiles.get(id).copied() {
                apply_merge_effect(frame, theme, rect, merge_effect, merge_effect_time, state.now);
            }
        }
    }

    if let (Some(source), Some(pointer)) = (session.dragging(), state.pointer) {
        let tiles = session.tiles();
        if let Some(tile) = tiles.get(source) {
            draw_floating_tile(frame, theme, tile, pointer, area);
        }
    }

    match state.screen {
        Screen::GameOver => draw_game_over(frame, state, layout.board),
        Screen::Playing if state.paused => draw_pause_overlay(frame, theme, layout.board),
        Screen::Playing => {}
    }
}

fn draw_header(frame: &mut Frame, state: &DrawState<'_>, area: Rect) {
    let theme = state.theme;
    let session = state.session;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // gap
            Constraint::Length(1), // modes
            Constraint::Length(1), // score, multiplier
            Constraint::Length(1), // countdown bar
            Constraint::Length(1), // gap
        ])
        .split(area);

    let title = Line::from(vec![
        Span::styled(" Fibo", Style::default().fg(theme.title).bold()),
        Span::styled("Flow ", Style::default().fg(theme.main_fg).bold()),
    ]);
    Paragraph::new(title)
        .alignment(Alignment::Center)
        .render(chunks[0], frame.buffer_mut());

    let mut spans = Vec::new();
    for (i, mode) in Mode::ALL.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::from("  "));
        }
        spans.push(Span::styled(
            format!(" {} {} ", i + 1, mode.label()),
            mode_style(theme, mode, session),
        ));
    }
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .render(chunks[2], frame.buffer_mut());

    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.main_fg);
    let stats = Line::from(vec![
        Span::styled("Score: ", label),
        Span::styled(session.score().to_string(), value),
        Span::from("   "),
        Span::styled("Multiplier: ", label),
        Span::styled(format!("{}x", session.multiplier()), value),
    ]);
    Paragraph::new(stats)
        .alignment(Alignment::Center)
        .render(chunks[3], frame.buffer_mut());

    let remaining = session.remaining();
    let duration = session.duration().max(1);
    let ratio = (f64::from(remaining) / f64::from(duration)).clamp(0.0, 1.0);
    let bar_color = if ratio > 0.6 {
        Color::Green
    } else if ratio > 0.3 {
        Color::Yellow
    } else {
        Color::Red
    };
    let gauge = Gauge::default()
        .ratio(ratio)
        .label(format!("{:02}:{:02}", remaining / 60, remaining % 60))
        .gauge_style(Style::default().fg(bar_color).bg(theme.div_line));
    gauge.render(chunks[4], frame.buffer_mut());
}

fn mode_style(theme: &Theme, mode: Mode, session: &GameSession) -> Style {
    if mode == session.mode() {
        Style::default().fg(Color::Black).bg(theme.title).bold()
    } else if session.can_switch_to(mode) {
        Style::default().fg(theme.main_fg)
    } else {
        Style::default()
            .fg(theme.inactive_fg)
            .add_modifier(Modifier::CROSSED_OUT)
    }
}

fn tile_colors(theme: &Theme, tile: &TileView, hints: bool) -> (Color, Color) {
    if tile.is_dragging {
        (theme.dragging, Color::Black)
    } else if tile.is_merged {
        (theme.merged, Color::Black)
    } else if tile.is_valid_target && hints {
        (theme.valid_target, Color::Black)
    } else {
        (theme.tile, theme.main_fg)
    }
}

fn draw_tile(
    frame: &mut Frame,
    theme: &Theme,
    tile: &TileView,
    rect: Rect,
    hints: bool,
    under_cursor: bool,
    lifted: bool,
) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let (bg, fg) = tile_colors(theme, tile, hints);
    let fg = if lifted { theme.inactive_fg } else { fg };
    let (border_color, border_type) = if under_cursor {
        (theme.cursor, BorderType::Thick)
    } else {
        (theme.div_line, BorderType::Rounded)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(border_color).bg(bg))
        .style(Style::default().bg(bg));
    let inner = block.inner(rect);
    block.render(rect, frame.buffer_mut());
    let pad = inner.height.saturating_sub(1) / 2;
    let mut lines: Vec<Line> = (0..pad).map(|_| Line::from("")).collect();
    lines.push(Line::from(Span::styled(
        tile.value.to_string(),
        Style::default().fg(fg).bg(bg).bold(),
    )));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(inner, frame.buffer_mut());
}

fn draw_board(frame: &mut Frame, state: &DrawState<'_>, layout: &ScreenLayout) {
    let theme = state.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg));
    block.render(layout.board, frame.buffer_mut());

    let hints = state.session.shows_hints();
    let columns = state.session.columns();
    let mouse_drag = state.pointer.is_some();
    for tile in state.session.tiles() {
        let Some(rect) = layout.tiles.get(tile.row * columns + tile.col).copied() else {
            continue;
        };
        let under_cursor = tile.id == state.cursor && state.screen == Screen::Playing;
        // While the mouse carries a tile, its grid slot is dimmed.
        let lifted = mouse_drag && tile.is_dragging;
        draw_tile(frame, theme, &tile, rect, hints, under_cursor, lifted);
    }
}

/// Copy of the dragged tile following the pointer.
fn draw_floating_tile(
    frame: &mut Frame,
    theme: &Theme,
    tile: &TileView,
    (column, row): (u16, u16),
    area: Rect,
) {
    let x = column
        .saturating_sub(TILE_W / 2)
        .min((area.x + area.width).saturating_sub(TILE_W));
    let y = row
        .saturating_sub(TILE_H / 2)
        .min((area.y + area.height).saturating_sub(TILE_H));
    let rect = clip(
        Rect {
            x,
            y,
            width: TILE_W,
            height: TILE_H,
        },
        area,
    );
    Clear.render(rect, frame.buffer_mut());
    draw_tile(frame, theme, tile, rect, false, false, false);
}

fn draw_footer(frame: &mut Frame, state: &DrawState<'_>, area: Rect) {
    let theme = state.theme;
    let status = if let Some(msg) = state.status {
        Span::styled(msg.to_string(), Style::default().fg(theme.title))
    } else if state.stuck && !state.session.is_over() {
        Span::styled(
            "No legal merges left. R to restart",
            Style::default().fg(Color::Red),
        )
    } else if !state.session.started() {
        Span::styled(
            "Merge two tiles to start the clock",
            Style::default().fg(theme.inactive_fg),
        )
    } else {
        Span::from("")
    };
    let key = Style::default().fg(theme.cursor);
    let help = Line::from(vec![
        Span::styled(" ←↑↓→ ", key),
        Span::from("MOVE  "),
        Span::styled(" SPACE ", key),
        Span::from("GRAB/DROP  "),
        Span::styled(" 1-3 ", key),
        Span::from("MODE  "),
        Span::styled(" R ", key),
        Span::from("RESTART  "),
        Span::styled(" Q ", key),
        Span::from("QUIT"),
    ]);
    let lines = vec![Line::from(status), Line::from(""), help];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.main_fg))
        .render(area, frame.buffer_mut());
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, board: Rect) {
    let popup = centered(board, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &DrawState<'_>, board: Rect) {
    let theme = state.theme;
    let session = state.session;
    let popup = centered(board, 30, 9);
    let best = session
        .tiles()
        .iter()
        .map(|t| t.value)
        .max()
        .unwrap_or(1);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Time's up! ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", session.score()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Biggest tile: {best} "),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R — Restart    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg))
            .title(Span::styled(
                format!(" FiboFlow · {} ", session.mode().label()),
                Style::default().fg(theme.title),
            )),
    );
    p.render(popup, frame.buffer_mut());
}

/// Create or advance the merge flash: the tile fades from the merged colour back to
/// its rendered colours.
fn apply_merge_effect(
    frame: &mut Frame,
    theme: &Theme,
    rect: Rect,
    merge_effect: &mut Option<Effect>,
    merge_effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = merge_effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *merge_effect_time = Some(now);

    if merge_effect.is_none() {
        let effect = fx::fade_from(
            theme.merged,
            theme.merged,
            (MERGE_FLASH_MS, Interpolation::Linear),
        )
        .with_area(rect);
        *merge_effect = Some(effect);
    }

    if let Some(effect) = merge_effect {
        frame.render_effect(effect, rect, TfxDuration::from_millis(delta_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_has_one_rect_per_tile() {
        let area = Rect::new(0, 0, 120, 40);
        let l = screen_layout(area, 4, 4, 16);
        assert_eq!(l.tiles.len(), 16);
        let (bw, bh) = board_size(4, 4);
        assert_eq!((l.board.width, l.board.height), (bw, bh));
        for r in &l.tiles {
            assert_eq!((r.width, r.height), (TILE_W, TILE_H));
        }
        // Row-major order.
        assert!(l.tiles[1].x > l.tiles[0].x);
        assert!(l.tiles[4].y > l.tiles[0].y);
        assert_eq!(l.tiles[4].x, l.tiles[0].x);
    }

    #[test]
    fn test_hit_testing() {
        let area = Rect::new(0, 0, 120, 40);
        let l = screen_layout(area, 3, 3, 9);
        let r = l.tiles[4];
        assert_eq!(tile_at(&l.tiles, r.x, r.y), Some(4));
        assert_eq!(tile_at(&l.tiles, r.x + r.width - 1, r.y + r.height - 1), Some(4));
        assert_eq!(tile_at(&l.tiles, 0, 0), None);
        // Gap between columns belongs to no tile.
        assert_eq!(tile_at(&l.tiles, l.tiles[0].x + TILE_W, l.tiles[0].y), None);
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let area = Rect::new(0, 0, 10, 5);
        let l = screen_layout(area, 4, 4, 16);
        assert_eq!(l.tiles.len(), 16);
        assert!(l.tiles.iter().all(|r| r.right() <= area.right() && r.bottom() <= area.bottom()));
    }
}
