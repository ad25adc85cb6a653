//! App: terminal init, main loop, countdown ticks, key and mouse handling.

use crate::GameConfig;
use crate::clock::{ClockSource, TICK_INTERVAL};
use crate::error::GameError;
use crate::input::{Action, Pointer, key_to_action, mouse_to_pointer, step_cursor};
use crate::mode::Mode;
use crate::session::{DropOutcome, GameSession, MergeEvent};
use crate::theme::Theme;
use crate::timer::{TickOutcome, TimerState};
use crate::ui::{self, DrawState};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

/// Whether the loop keeps going after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: GameSession,
    screen: Screen,
    /// Countdown tick source; paused together with the game.
    clock: ClockSource,
    /// Keyboard cursor (tile id).
    cursor: usize,
    /// Pointer position while a mouse drag is in flight.
    pointer: Option<(u16, u16)>,
    /// Last frame area, for mouse hit testing.
    area: Rect,
    /// One-line feedback (rejected merge, locked mode, points scored).
    status: Option<String>,
    flash_tile: Option<usize>,
    /// TachyonFX flash on the last merged tile (created on first draw after a merge).
    merge_effect: Option<Effect>,
    /// Last time we processed the merge effect (for delta).
    merge_effect_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let session = GameSession::new(config.mode);
        Self {
            config,
            theme,
            session,
            screen: Screen::Playing,
            clock: ClockSource::new(TICK_INTERVAL, Instant::now()),
            cursor: 0,
            pointer: None,
            area: Rect::default(),
            status: None,
            flash_tile: None,
            merge_effect: None,
            merge_effect_time: None,
        }
    }

    fn reset_game(&mut self, now: Instant) {
        self.session.restart();
        self.screen = Screen::Playing;
        self.clock = ClockSource::new(TICK_INTERVAL, now);
        self.cursor = self.cursor.min(self.session.tile_count().saturating_sub(1));
        self.pointer = None;
        self.status = None;
        self.clear_flash();
    }

    fn clear_flash(&mut self) {
        self.flash_tile = None;
        self.merge_effect = None;
        self.merge_effect_time = None;
    }

    fn on_merged(&mut self, ev: MergeEvent, now: Instant) {
        self.clock.rearm(now);
        self.clear_flash();
        self.flash_tile = Some(ev.target);
        self.status = Some(format!(
            "+{}  ({} x{})",
            ev.points,
            ev.sum,
            self.session.multiplier()
        ));
    }

    fn report(&mut self, err: GameError) {
        debug!(error = %err, "rejected");
        self.status = Some(match err {
            GameError::InvalidMergeAttempt {
                dragged_value,
                target_value,
                ..
            } => format!(
                "{dragged_value} + {target_value} = {} is not a Fibonacci number",
                dragged_value.saturating_add(target_value)
            ),
            GameError::IllegalModeTransition { from, .. } if from.is_extreme() => {
                "Run started in EXTREME: restart to change mode".to_string()
            }
            GameError::IllegalModeTransition { .. } => {
                "EXTREME is locked once a run has started: restart first".to_string()
            }
            other => other.to_string(),
        });
    }

    fn select_mode(&mut self, mode: Mode, now: Instant) {
        match self.session.set_mode(mode) {
            Ok(_) => {
                self.cursor = self.cursor.min(self.session.tile_count().saturating_sub(1));
                self.pointer = None;
                self.status = None;
                if !self.session.started() {
                    self.clock.rearm(now);
                }
            }
            Err(e) => self.report(e),
        }
    }

    /// Next reachable mode in order, skipping locked ones.
    fn cycle_mode(&mut self, forward: bool, now: Instant) {
        let current = self.session.mode();
        let mut candidate = current.cycle(forward);
        while candidate != current {
            if self.session.can_switch_to(candidate) {
                self.select_mode(candidate, now);
                return;
            }
            candidate = candidate.cycle(forward);
        }
        self.report(GameError::IllegalModeTransition {
            from: current,
            to: current.cycle(forward),
        });
    }

    fn set_paused(&mut self, paused: bool, now: Instant) {
        if paused == self.clock.is_paused() {
            return;
        }
        if paused {
            self.clock.pause(now);
        } else {
            self.clock.resume(now);
        }
        debug!(paused, "pause toggled");
    }

    fn grab(&mut self, now: Instant) {
        let target = self.cursor;
        if self.session.dragging().is_none() {
            match self.session.begin_drag(target) {
                Ok(()) => self.status = None,
                Err(e) => self.report(e),
            }
            return;
        }
        self.drop_on(target, now);
    }

    fn drop_on(&mut self, target: usize, now: Instant) {
        match self.session.drop_on(target, now) {
            Ok(DropOutcome::Merged(ev)) => self.on_merged(ev, now),
            Ok(DropOutcome::Cancelled) => {}
            Err(e) => self.report(e),
        }
    }

    fn handle_action(&mut self, action: Action, now: Instant) -> Flow {
        match action {
            Action::Quit => return Flow::Quit,
            Action::None => {}
            _ if self.screen == Screen::GameOver => match action {
                Action::Restart => self.reset_game(now),
                Action::Cancel => return Flow::Quit,
                _ => {}
            },
            _ if self.clock.is_paused() => {
                if action == Action::Pause {
                    self.set_paused(false, now);
                }
            }
            Action::Pause => self.set_paused(true, now),
            Action::Restart => self.reset_game(now),
            Action::CursorLeft | Action::CursorRight | Action::CursorUp | Action::CursorDown => {
                self.cursor = step_cursor(
                    self.cursor,
                    action,
                    self.session.columns(),
                    self.session.tile_count(),
                );
            }
            Action::Grab => self.grab(now),
            Action::Cancel => {
                if self.session.dragging().is_none() {
                    return Flow::Quit;
                }
                self.session.cancel_drag();
                self.pointer = None;
            }
            Action::SelectMode(mode) => self.select_mode(mode, now),
            Action::NextMode => self.cycle_mode(true, now),
            Action::PrevMode => self.cycle_mode(false, now),
        }
        Flow::Continue
    }

    fn handle_pointer(&mut self, pointer: Pointer, now: Instant) {
        if self.screen != Screen::Playing || self.clock.is_paused() {
            return;
        }
        let layout = ui::screen_layout(
            self.area,
            self.session.rows(),
            self.session.columns(),
            self.session.tile_count(),
        );
        match pointer {
            Pointer::Press { column, row } => {
                let Some(id) = ui::tile_at(&layout.tiles, column, row) else {
                    return;
                };
                self.cursor = id;
                match self.session.begin_drag(id) {
                    Ok(()) => {
                        self.pointer = Some((column, row));
                        self.status = None;
                    }
                    Err(e) => self.report(e),
                }
            }
            Pointer::Move { column, row } => {
                if self.session.dragging().is_some() {
                    self.pointer = Some((column, row));
                }
            }
            Pointer::Release { column, row } => {
                self.pointer = None;
                if self.session.dragging().is_none() {
                    return;
                }
                match ui::tile_at(&layout.tiles, column, row) {
                    Some(id) => {
                        self.cursor = id;
                        self.drop_on(id, now);
                    }
                    None => self.session.cancel_drag(),
                }
            }
            Pointer::Ignore => {}
        }
    }

    /// Deliver due countdown ticks. Only runs while the timer is running and not paused.
    fn tick_countdown(&mut self, now: Instant) {
        if self.screen != Screen::Playing
            || self.clock.is_paused()
            || self.session.timer_state() != TimerState::Running
        {
            return;
        }
        for _ in 0..self.clock.due_ticks(now) {
            if self.session.tick() == TickOutcome::Expired {
                info!(score = self.session.score(), "game over");
                self.screen = Screen::GameOver;
                self.pointer = None;
                self.status = None;
                break;
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
                PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        if self.config.mouse {
            execute!(stdout, EnableMouseCapture)?;
        }
        // Release events let us ignore key repeats cleanly; not every terminal supports it.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        info!(mode = ?self.session.mode(), "terminal ready");

        let result = self.run_loop(&mut terminal);

        // Restore
        let mut stdout = std::io::stdout();
        let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        if self.config.mouse {
            let _ = execute!(stdout, DisableMouseCapture);
        }
        execute!(stdout, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        loop {
            let now = Instant::now();
            self.session.expire_merge_marks(now);
            self.tick_countdown(now);
            let stuck = self.session.started() && self.session.is_stuck();

            terminal.draw(|f| {
                self.area = f.area();
                let state = DrawState {
                    session: &self.session,
                    theme: &self.theme,
                    screen: self.screen,
                    paused: self.clock.is_paused(),
                    cursor: self.cursor,
                    pointer: self.pointer,
                    status: self.status.as_deref(),
                    stuck,
                    flash_tile: self.flash_tile,
                    no_animation: self.config.no_animation,
                    now,
                };
                ui::draw(f, &state, &mut self.merge_effect, &mut self.merge_effect_time);
            })?;

            if self.merge_effect.as_ref().is_some_and(Effect::done) {
                self.clear_flash();
            }

            // Wake up early for a due merged-flag clear.
            let mut timeout = frame_duration.saturating_sub(now.elapsed());
            if let Some(deadline) = self.session.next_mark_deadline() {
                timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
            }

            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                let now = Instant::now();
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_action(key_to_action(key), now) == Flow::Quit {
                            return Ok(());
                        }
                    }
                    Event::Mouse(mouse) => self.handle_pointer(mouse_to_pointer(mouse), now),
                    _ => {}
                }
            }
        }
    }
}
