use std::io;
use std::time::{Duration, Instant};

use crossterm::event::Event;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use thiserror::Error;
use tracing::{debug, trace};

use crate::constants::DEFAULT_POLL_INTERVAL;
use crate::drivers::buffer::BufferBackend;
use crate::drivers::{InputDriver, OutputDriver};
use crate::error::TreeError;
use crate::node::{LayoutMode, NodeId};
use crate::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Quit,
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Single-threaded loop driving one tree.
///
/// Each tick runs queued invocations and due timers, lays out whatever asked
/// for it, repaints damaged nodes into a persistent screen buffer and hands
/// that buffer to the output driver. Between ticks it waits for input and
/// drains every queued event before painting again, so bursts of mouse
/// motion do not fall behind.
pub struct EventLoop<D, O> {
    input: D,
    output: O,
    poll_interval: Duration,
    screen: Buffer,
}

impl<D: InputDriver, O: OutputDriver> EventLoop<D, O> {
    pub fn new(input: D, output: O, poll_interval: Duration) -> Self {
        Self {
            input,
            output,
            poll_interval,
            screen: Buffer::empty(Rect::ZERO),
        }
    }

    /// Loop waiting [`DEFAULT_POLL_INTERVAL`] for input between idle ticks.
    pub fn with_drivers(input: D, output: O) -> Self {
        Self::new(input, output, DEFAULT_POLL_INTERVAL)
    }

    pub fn poll(&mut self) -> io::Result<Option<Event>> {
        if self.input.poll(self.poll_interval)? {
            Ok(Some(self.input.read()?))
        } else {
            Ok(None)
        }
    }

    pub fn input_mut(&mut self) -> &mut D {
        &mut self.input
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Last painted screen contents.
    pub fn screen(&self) -> &Buffer {
        &self.screen
    }

    /// One frame: pending work, screen size, layout, redraw, present.
    pub fn tick(&mut self, tree: &mut Tree, top: NodeId) -> Result<(), LoopError> {
        tree.run_pending(Instant::now());
        if let Some(enabled) = tree.runtime_mut().take_mouse_capture_change() {
            self.input.set_mouse_capture(enabled)?;
        }

        let area = self.output.size()?;
        if area != self.screen.area {
            debug!(?area, "screen resized");
            self.screen.resize(area);
            self.screen.reset();
            match tree.node(top)?.layout_mode() {
                LayoutMode::Absolute => tree.set_frame(top, area)?,
                LayoutMode::Computed => tree.set_needs_layout(top)?,
            }
            tree.set_needs_display(top)?;
        }
        tree.layout_if_needed(top, area)?;

        if !tree.needs_display(top) && !tree.child_needs_display(top) {
            return Ok(());
        }
        trace!(top = ?top, "repaint");
        tree.redraw(top, &mut BufferBackend::new(&mut self.screen), None)?;
        self.output.present(&self.screen)?;
        Ok(())
    }

    /// Runs until `on_event` returns [`ControlFlow::Quit`].
    ///
    /// Every input event is dispatched into the tree first; `on_event` then
    /// sees it along with whether the tree handled it.
    pub fn run<F>(&mut self, tree: &mut Tree, top: NodeId, on_event: F) -> Result<(), LoopError>
    where
        F: FnMut(&mut Tree, &Event, bool) -> ControlFlow,
    {
        tree.set_top(top)?;
        self.output.enter()?;
        let result = self.pump(tree, top, on_event);
        self.output.exit()?;
        result
    }

    fn pump<F>(&mut self, tree: &mut Tree, top: NodeId, mut on_event: F) -> Result<(), LoopError>
    where
        F: FnMut(&mut Tree, &Event, bool) -> ControlFlow,
    {
        loop {
            self.tick(tree, top)?;
            let wait = tree
                .runtime()
                .next_deadline(Instant::now())
                .map_or(self.poll_interval, |due| due.min(self.poll_interval));
            if !self.input.poll(wait)? {
                continue;
            }
            loop {
                let event = self.input.read()?;
                let handled = tree.dispatch_event(top, &event);
                if on_event(tree, &event, handled) == ControlFlow::Quit {
                    self.tick(tree, top)?;
                    return Ok(());
                }
                if !self.input.poll(Duration::from_millis(0))? {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TextBlock;
    use crate::node::Node;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Event>);

    impl InputDriver for Scripted {
        fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
            Ok(!self.0.is_empty())
        }

        fn read(&mut self) -> io::Result<Event> {
            self.0
                .pop_front()
                .ok_or_else(|| io::Error::other("script exhausted"))
        }
    }

    #[derive(Default)]
    struct Recorder {
        size: Rect,
        presented: usize,
        last: Option<Buffer>,
        entered: bool,
    }

    impl OutputDriver for Recorder {
        fn enter(&mut self) -> io::Result<()> {
            self.entered = true;
            Ok(())
        }

        fn exit(&mut self) -> io::Result<()> {
            self.entered = false;
            Ok(())
        }

        fn size(&self) -> io::Result<Rect> {
            Ok(self.size)
        }

        fn present(&mut self, screen: &Buffer) -> io::Result<()> {
            self.presented += 1;
            self.last = Some(screen.clone());
            Ok(())
        }
    }

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn unchanged_frames_are_not_presented_again() {
        let mut tree = Tree::new();
        let top = tree.insert(Node::new("top").with_widget(TextBlock::from_lines(["hi"])));
        let output = Recorder {
            size: Rect::new(0, 0, 4, 1),
            ..Recorder::default()
        };
        let mut lp = EventLoop::new(Scripted(VecDeque::new()), output, Duration::ZERO);
        lp.tick(&mut tree, top).unwrap();
        lp.tick(&mut tree, top).unwrap();
        assert_eq!(lp.output_mut().presented, 1);
        assert_eq!(tree.frame(top), Some(Rect::new(0, 0, 4, 1)));
        assert_eq!(lp.screen().cell((1, 0)).map(|c| c.symbol()), Some("i"));

        lp.output_mut().size = Rect::new(0, 0, 6, 2);
        lp.tick(&mut tree, top).unwrap();
        assert_eq!(lp.output_mut().presented, 2);
        assert_eq!(lp.screen().area, Rect::new(0, 0, 6, 2));
    }

    #[test]
    fn run_dispatches_until_quit() {
        let mut tree = Tree::new();
        let top = tree.insert(Node::new("top"));
        let script = Scripted(VecDeque::from([key('a'), key('b'), key('q')]));
        let mut lp = EventLoop::new(
            script,
            Recorder {
                size: Rect::new(0, 0, 2, 2),
                ..Recorder::default()
            },
            Duration::ZERO,
        );
        let mut seen = Vec::new();
        lp.run(&mut tree, top, |_, event, handled| {
            assert!(!handled);
            if let Event::Key(k) = event {
                seen.push(k.code);
                if k.code == KeyCode::Char('q') {
                    return ControlFlow::Quit;
                }
            }
            ControlFlow::Continue
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![KeyCode::Char('a'), KeyCode::Char('b'), KeyCode::Char('q')]
        );
        assert!(!lp.output_mut().entered);
        assert_eq!(tree.runtime().top(), Some(top));
    }

    #[test]
    fn mouse_capture_changes_reach_the_driver() {
        struct Capture(Vec<bool>);
        impl InputDriver for Capture {
            fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
                Ok(false)
            }
            fn read(&mut self) -> io::Result<Event> {
                Err(io::Error::other("no input"))
            }
            fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
                self.0.push(enabled);
                Ok(())
            }
        }
        let mut tree = Tree::new();
        let top = tree.insert(Node::new("top"));
        let mut lp = EventLoop::with_drivers(Capture(Vec::new()), Recorder::default());
        tree.runtime_mut().set_mouse_capture_enabled(false);
        lp.tick(&mut tree, top).unwrap();
        lp.tick(&mut tree, top).unwrap();
        assert_eq!(lp.input_mut().0, vec![false]);
    }
}
