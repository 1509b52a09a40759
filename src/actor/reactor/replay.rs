use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use kurbo::Rect;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::{Event, Reactor};
use crate::sys::window::{WindowHandle, WindowId};

/// A window with no host behind it. Replays and the simulator drive the
/// reactor with these; frame, raise and focus requests are only recorded.
#[derive(Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct SimWindow {
    pub id: WindowId,
    #[serde(default)]
    pub frame: Rect,
    #[serde(default)]
    pub monitor: usize,
    #[serde(default)]
    pub workspace: usize,
    #[serde(default)]
    pub floating: bool,
    #[serde(skip)]
    pub raised: u32,
    #[serde(skip)]
    pub activated: u32,
}

impl WindowHandle for SimWindow {
    fn id(&self) -> WindowId { self.id }

    fn frame_rect(&self) -> Rect { self.frame }

    fn set_frame_rect(&mut self, rect: Rect) { self.frame = rect; }

    fn monitor_index(&self) -> usize { self.monitor }

    fn workspace_index(&self) -> usize { self.workspace }

    fn raise(&mut self) { self.raised += 1; }

    fn activate(&mut self) { self.activated += 1; }

    fn is_floating_hint(&self) -> bool { self.floating }
}

/// Appends every handled event to a file, one RON value per line, so a
/// session can be replayed later.
#[derive(Default)]
pub struct Record {
    file: Option<BufWriter<File>>,
}

impl Record {
    pub fn new(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Record::default());
        };
        let file = File::create(path)
            .with_context(|| format!("creating event record {}", path.display()))?;
        info!(path = %path.display(), "Recording events");
        Ok(Record { file: Some(BufWriter::new(file)) })
    }

    pub fn is_recording(&self) -> bool { self.file.is_some() }

    pub(super) fn on_event<W: Serialize>(&mut self, event: &Event<W>) {
        let Some(file) = &mut self.file else {
            return;
        };
        let written = ron::to_string(event).map_err(anyhow::Error::from).and_then(|line| {
            writeln!(file, "{line}")?;
            file.flush()?;
            Ok(())
        });
        if let Err(err) = written {
            warn!(%err, "Event recording failed; recording stopped");
            self.file = None;
        }
    }
}

/// Reads a recorded session. Blank lines and lines starting with `//` are
/// skipped.
pub fn read_events<W: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<Event<W>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading event record {}", path.display()))?;
    text.lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with("//"))
        .map(|(n, line)| {
            ron::from_str(line).with_context(|| format!("{}:{n}: invalid event", path.display()))
        })
        .collect()
}

/// Feeds a recorded session into `reactor` and flushes the engine after it.
/// Returns the number of events replayed.
pub fn replay<W>(path: &Path, reactor: &mut Reactor<W>) -> anyhow::Result<usize>
where
    W: WindowHandle + fmt::Debug + Serialize + DeserializeOwned,
{
    let events = read_events::<W>(path)?;
    let count = events.len();
    for event in events {
        reactor.handle_event(event);
        reactor.tick();
    }
    reactor.flush();
    Ok(count)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor::reactor::testing::reactor_with_monitor;
    use crate::layout_engine::{Direction, LayoutCommand};

    #[test]
    fn recorded_session_replays_to_the_same_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.ron");

        let mut recorded = reactor_with_monitor();
        recorded.record = Record::new(Some(&path)).unwrap();
        assert!(recorded.record.is_recording());
        recorded.handle_event(Event::WindowCreated(SimWindow::new(1)));
        recorded.handle_event(Event::WindowCreated(SimWindow::new(2)));
        recorded.handle_event(Event::WindowFocused(WindowId::new(2)));
        recorded.handle_event(Event::Command(LayoutCommand::MoveNode(Direction::Left)));
        recorded.flush();

        let mut replayed = reactor_with_monitor();
        assert_eq!(replay(&path, &mut replayed).unwrap(), 4);
        for wid in [WindowId::new(1), WindowId::new(2)] {
            assert_eq!(replayed.window(wid).unwrap().frame, recorded.window(wid).unwrap().frame);
        }
        assert_eq!(
            replayed.window(WindowId::new(2)).unwrap().frame,
            Rect::new(0., 0., 500., 500.)
        );
    }

    #[test]
    fn hand_written_scenarios_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.ron");
        std::fs::write(
            &path,
            "// a floating dialog\n\
             window_created((id: 7, floating: true))\n\
             \n\
             command(move_focus(left))\n",
        )
        .unwrap();

        let events = read_events::<SimWindow>(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::WindowCreated(w) if w.floating && w.id == WindowId::new(7)));
        assert!(matches!(events[1], Event::Command(LayoutCommand::MoveFocus(Direction::Left))));
    }

    #[test]
    fn bad_lines_report_their_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "grab_cancel\nnot_an_event(\n").unwrap();

        let err = read_events::<SimWindow>(&path).unwrap_err();
        assert!(format!("{err}").contains(":2:"));
    }
}
