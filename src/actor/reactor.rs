//! The Reactor keeps the host's windows and the layout engine in step.
//!
//! Host events come in through [`Reactor::handle_event`]. The engine answers
//! with deferred work that the reactor drains on every tick, writing frames,
//! raise and focus requests back through each window's [`WindowHandle`].

mod replay;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::time::Duration;

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

pub use replay::{Record, SimWindow, read_events, replay};

use super::Receiver;
use crate::common::collections::HashMap;
use crate::common::config::Config;
use crate::layout_engine::{DropPreview, EventResponse, GrabKind, LayoutCommand, LayoutEngine};
use crate::sys::window::{WindowHandle, WindowId};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum Event<W> {
    /// Work areas of every monitor, primary first. Sent before any window.
    MonitorsChanged(Vec<Rect>),
    WorkspaceAdded(usize),
    WorkspaceRemoved(usize),
    WorkspaceActivated(usize),

    WindowCreated(W),
    WindowDestroyed(WindowId),
    WindowFocused(WindowId),
    /// The host moved a window to another monitor or workspace. Carries the
    /// window's updated handle.
    WindowLocationChanged(W),

    GrabBegin { wid: WindowId, kind: GrabKind },
    GrabUpdate { wid: WindowId, frame: Rect, pointer: Point },
    GrabEnd { wid: WindowId, cancelled: bool },
    /// The user aborted the gesture (e.g. pressed Escape) before releasing.
    GrabCancel,

    Command(LayoutCommand),
    ConfigUpdated(Config),
    ReloadTree,
}

pub struct Reactor<W> {
    config: Config,
    windows: HashMap<WindowId, W>,
    layout_engine: LayoutEngine,
    record: Record,
}

impl<W> Reactor<W>
where
    W: WindowHandle + fmt::Debug + Serialize,
{
    pub fn new(config: Config, record: Record) -> Self {
        let layout_engine = LayoutEngine::new(&config.settings.layout);
        Reactor {
            config,
            windows: HashMap::default(),
            layout_engine,
            record,
        }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn layout_engine(&self) -> &LayoutEngine { &self.layout_engine }

    pub fn window(&self, wid: WindowId) -> Option<&W> { self.windows.get(&wid) }

    pub fn windows(&self) -> impl Iterator<Item = &W> { self.windows.values() }

    pub fn drop_preview(&self) -> Option<DropPreview> { self.layout_engine.drop_preview() }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.settings.tick_interval_ms)
    }

    /// Handles events until every sender is gone, ticking the engine on the
    /// configured interval. Pending work is flushed before returning.
    pub fn run(mut self, events: Receiver<Event<W>>) -> Self {
        let mut interval = self.tick_interval();
        let mut ticker = crossbeam_channel::tick(interval);
        loop {
            crossbeam_channel::select! {
                recv(events) -> msg => {
                    let Ok((span, event)) = msg else { break };
                    let _guard = span.enter();
                    self.handle_event(event);
                }
                recv(ticker) -> _ => {
                    self.tick();
                }
            }
            if self.tick_interval() != interval {
                interval = self.tick_interval();
                ticker = crossbeam_channel::tick(interval);
            }
        }
        self.flush();
        self
    }

    fn log_event(&self, event: &Event<W>) {
        match event {
            Event::GrabUpdate { .. } => trace!(?event, "Event"),
            _ => debug!(?event, "Event"),
        }
    }

    #[instrument(name = "reactor::handle_event", skip(self), fields(event=?event))]
    pub fn handle_event(&mut self, event: Event<W>) {
        self.log_event(&event);
        self.record.on_event(&event);

        match event {
            Event::MonitorsChanged(work_areas) => {
                self.layout_engine.set_monitors(work_areas);
            }
            Event::WorkspaceAdded(index) => {
                self.layout_engine.add_workspace(index);
            }
            Event::WorkspaceRemoved(index) => {
                self.layout_engine.remove_workspace(index);
                let engine = &self.layout_engine;
                self.windows.retain(|wid, _| engine.find_node(*wid).is_some());
            }
            Event::WorkspaceActivated(index) => self.layout_engine.set_active_workspace(index),
            Event::WindowCreated(window) => {
                let wid = window.id();
                if self.layout_engine.track_window(&window) {
                    self.windows.insert(wid, window);
                }
            }
            Event::WindowDestroyed(wid) => {
                self.windows.remove(&wid);
                self.layout_engine.untrack_window(wid);
            }
            Event::WindowFocused(wid) => self.layout_engine.window_focused(wid),
            Event::WindowLocationChanged(window) => {
                let wid = window.id();
                if !self.windows.contains_key(&wid) {
                    warn!(?wid, "Location change for an unknown window");
                    return;
                }
                self.layout_engine.update_window_location(&window);
                self.windows.insert(wid, window);
            }
            Event::GrabBegin { wid, kind } => {
                let Some(window) = self.windows.get(&wid) else {
                    warn!(?wid, "Grab on an unknown window");
                    return;
                };
                self.layout_engine.begin_grab(window, kind);
            }
            Event::GrabUpdate { wid, frame, pointer } => {
                self.layout_engine.update_grab(wid, frame, pointer);
            }
            Event::GrabEnd { wid, cancelled } => {
                self.layout_engine.end_grab(wid, cancelled);
            }
            Event::GrabCancel => {
                self.layout_engine.cancel_grab();
            }
            Event::Command(command) => {
                self.layout_engine.handle_command(command);
            }
            Event::ConfigUpdated(mut config) => {
                let fixed = config.auto_fix_values();
                if fixed > 0 {
                    warn!(fixed, "Corrected invalid config values");
                }
                self.config = config;
                self.layout_engine.set_layout_settings(&self.config.settings.layout);
            }
            Event::ReloadTree => {
                self.layout_engine.reload_tree(self.windows.values());
            }
        }
    }

    /// Runs one deferred engine task. Returns false when there was nothing to
    /// do.
    pub fn tick(&mut self) -> bool {
        let response = self.layout_engine.tick();
        if response.is_empty() {
            return false;
        }
        self.handle_layout_response(response);
        true
    }

    /// Ticks until the engine's queue is empty.
    pub fn flush(&mut self) {
        while !self.layout_engine.queue().is_empty() {
            self.tick();
        }
    }

    fn handle_layout_response(&mut self, response: EventResponse) {
        let EventResponse { frames, raise_windows, focus_window } = response;

        for (wid, frame) in frames {
            match self.windows.get_mut(&wid) {
                Some(window) => window.set_frame_rect(frame),
                None => trace!(?wid, "Frame for a window without a handle"),
            }
        }
        for wid in raise_windows {
            if let Some(window) = self.windows.get_mut(&wid) {
                window.raise();
            }
        }
        if let Some(wid) = focus_window {
            if let Some(window) = self.windows.get_mut(&wid) {
                window.activate();
            }
        }
    }
}
