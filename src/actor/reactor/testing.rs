use kurbo::Rect;

use super::{Record, Reactor, SimWindow};
use crate::common::config::Config;
use crate::sys::window::WindowId;

pub(crate) type TestWindow = SimWindow;

impl SimWindow {
    pub(crate) fn new(id: u64) -> Self {
        SimWindow {
            id: WindowId::new(id),
            frame: Rect::new(0., 0., 100., 100.),
            monitor: 0,
            workspace: 0,
            floating: false,
            raised: 0,
            activated: 0,
        }
    }

    pub(crate) fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    pub(crate) fn on(mut self, monitor: usize, workspace: usize) -> Self {
        self.monitor = monitor;
        self.workspace = workspace;
        self
    }

    pub(crate) fn floating(mut self) -> Self {
        self.floating = true;
        self
    }
}

/// A reactor with one 1000x500 monitor, workspace 0 and no gaps.
pub(crate) fn reactor_with_monitor() -> Reactor<TestWindow> {
    let mut config = Config::default();
    config.settings.layout.gaps.size = 0;
    let mut reactor = Reactor::new(config, Record::default());
    reactor.handle_event(super::Event::MonitorsChanged(vec![Rect::new(0., 0., 1000., 500.)]));
    reactor.handle_event(super::Event::WorkspaceAdded(0));
    reactor.flush();
    reactor
}
