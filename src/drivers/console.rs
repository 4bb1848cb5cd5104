use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{DisableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use super::{InputDriver, OutputDriver};

/// Folds Shift+Tab into BackTab and drops key releases so the router only
/// sees presses.
fn normalize(evt: Event) -> Option<Event> {
    match evt {
        Event::Key(mut key) => {
            if key.code == KeyCode::Tab && key.modifiers.contains(KeyModifiers::SHIFT) {
                key.code = KeyCode::BackTab;
                key.modifiers.remove(KeyModifiers::SHIFT);
            }
            if key.kind == KeyEventKind::Release {
                return None;
            }
            Some(Event::Key(key))
        }
        other => Some(other),
    }
}

#[derive(Default)]
pub struct ConsoleInputDriver {
    event_queue: VecDeque<Event>,
}

impl ConsoleInputDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event ahead of the terminal, as if it had been read.
    pub fn inject(&mut self, evt: Event) {
        if let Some(evt) = normalize(evt) {
            self.event_queue.push_back(evt);
        }
    }

    fn read_internal(&mut self) -> io::Result<Event> {
        loop {
            let evt = crossterm::event::read()?;
            if let Some(normalized) = normalize(evt) {
                return Ok(normalized);
            }
        }
    }
}

impl InputDriver for ConsoleInputDriver {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        if !self.event_queue.is_empty() {
            return Ok(true);
        }
        crossterm::event::poll(timeout)
    }

    fn read(&mut self) -> io::Result<Event> {
        if let Some(evt) = self.event_queue.pop_front() {
            return Ok(evt);
        }
        self.read_internal()
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
        if enabled {
            crossterm::execute!(std::io::stdout(), crossterm::event::EnableMouseCapture)
        } else {
            crossterm::execute!(std::io::stdout(), crossterm::event::DisableMouseCapture)
        }
    }
}

pub struct ConsoleOutputDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    entered: bool,
}

impl ConsoleOutputDriver {
    pub fn new() -> io::Result<Self> {
        let stdout = io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self {
            terminal,
            entered: false,
        })
    }
}

impl OutputDriver for ConsoleOutputDriver {
    fn enter(&mut self) -> io::Result<()> {
        if self.entered {
            return Ok(());
        }
        execute!(self.terminal.backend_mut(), EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        self.terminal.hide_cursor()?;
        self.entered = true;
        Ok(())
    }

    fn exit(&mut self) -> io::Result<()> {
        if !self.entered {
            return Ok(());
        }
        terminal::disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        self.entered = false;
        Ok(())
    }

    fn size(&self) -> io::Result<Rect> {
        let (cols, rows) = terminal::size()?;
        Ok(Rect::new(0, 0, cols, rows))
    }

    fn present(&mut self, screen: &Buffer) -> io::Result<()> {
        self.terminal
            .draw(|frame| {
                let area = frame.area();
                let target = frame.buffer_mut();
                let overlap = screen.area.intersection(area);
                for y in overlap.y..overlap.bottom() {
                    for x in overlap.x..overlap.right() {
                        if let (Some(src), Some(dst)) = (screen.cell((x, y)), target.cell_mut((x, y)))
                        {
                            *dst = src.clone();
                        }
                    }
                }
            })
            .map(|_| ())
            .map_err(|err| io::Error::other(err.to_string()))
    }
}

impl Drop for ConsoleOutputDriver {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}
