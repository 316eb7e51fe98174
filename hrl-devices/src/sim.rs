//! In-memory stand-ins for the vendor hardware.
//!
//! [`SimulatedRig`] is cheap to clone and every clone shares the same state,
//! so a test can hand one clone to a session and inspect another.

use hrl_core::{
    ButtonSource, Display, DisplayMode, GraphicsKind, HrlError, HrlResult, InputKind,
    PhotometerKind, PhotometerLink, Rig,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Button presses queued in advance. Each carries the delay after which it
/// arrives, measured from the start of the wait that receives it.
#[derive(Debug, Default)]
pub struct ScriptedButtons {
    events: VecDeque<(u32, Duration)>,
}

impl ScriptedButtons {
    pub fn new(events: impl IntoIterator<Item = (u32, Duration)>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn push(&mut self, code: u32, after: Duration) {
        self.events.push_back((code, after));
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Drops every press still queued.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl ButtonSource for ScriptedButtons {
    fn wait_button(&mut self, timeout: Duration) -> HrlResult<Option<(u32, Duration)>> {
        let Some((code, after)) = self.events.pop_front() else {
            return Ok(None);
        };
        if after > timeout {
            // the wait ends first; the press is still coming
            self.events.push_front((code, after - timeout));
            return Ok(None);
        }
        Ok(Some((code, after)))
    }
}

#[derive(Debug, Default)]
struct SimState {
    buttons: ScriptedButtons,
    replies: VecDeque<String>,
    commands: Vec<String>,
    frames_presented: usize,
    last_frame: Vec<u8>,
    frame_size: (u32, u32),
    datapixx_open: bool,
    close_calls: usize,
    opened: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedRig {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_button(&self, code: u32, after: Duration) {
        self.state.lock().buttons.push(code, after);
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.state.lock().replies.push_back(reply.into());
    }

    pub fn pending_buttons(&self) -> usize {
        self.state.lock().buttons.pending()
    }

    /// Discards queued presses, including ones a timed-out wait left behind.
    pub fn clear_buttons(&self) {
        self.state.lock().buttons.clear();
    }

    /// Commands the photometer link has received, oldest first.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }

    pub fn frames_presented(&self) -> usize {
        self.state.lock().frames_presented
    }

    pub fn last_frame(&self) -> Vec<u8> {
        self.state.lock().last_frame.clone()
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.state.lock().frame_size
    }

    pub fn datapixx_open(&self) -> bool {
        self.state.lock().datapixx_open
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    /// Devices handed out so far, e.g. `["display:gpu", "buttons:keyboard"]`.
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    fn open_datapixx(&self) {
        let mut state = self.state.lock();
        if !state.datapixx_open {
            tracing::debug!("simulated DATAPixx opened");
            state.datapixx_open = true;
        }
    }
}

struct SimDisplay(Arc<Mutex<SimState>>);

impl Display for SimDisplay {
    fn present(&mut self, rgba: &[u8], width: u32, height: u32) -> HrlResult<()> {
        let mut state = self.0.lock();
        state.frames_presented += 1;
        state.last_frame.clear();
        state.last_frame.extend_from_slice(rgba);
        state.frame_size = (width, height);
        Ok(())
    }
}

struct SimButtons(Arc<Mutex<SimState>>);

impl ButtonSource for SimButtons {
    fn wait_button(&mut self, timeout: Duration) -> HrlResult<Option<(u32, Duration)>> {
        self.0.lock().buttons.wait_button(timeout)
    }
}

struct SimLink(Arc<Mutex<SimState>>);

impl PhotometerLink for SimLink {
    fn transact(&mut self, command: &str) -> HrlResult<String> {
        let mut state = self.0.lock();
        state.commands.push(command.to_string());
        state
            .replies
            .pop_front()
            .ok_or_else(|| HrlError::Device("simulated photometer has no reply queued".into()))
    }
}

impl Rig for SimulatedRig {
    fn open_display(
        &mut self,
        kind: GraphicsKind,
        mode: &DisplayMode,
    ) -> HrlResult<Box<dyn Display>> {
        if kind.uses_datapixx() {
            self.open_datapixx();
        }
        let mut state = self.state.lock();
        state.opened.push(format!("display:{kind:?}").to_lowercase());
        state.frame_size = (mode.width, mode.height);
        Ok(Box::new(SimDisplay(Arc::clone(&self.state))))
    }

    fn open_buttons(&mut self, kind: InputKind) -> HrlResult<Box<dyn ButtonSource>> {
        if kind.uses_datapixx() {
            self.open_datapixx();
        }
        self.state
            .lock()
            .opened
            .push(format!("buttons:{kind:?}").to_lowercase());
        Ok(Box::new(SimButtons(Arc::clone(&self.state))))
    }

    fn open_photometer(
        &mut self,
        kind: PhotometerKind,
        port: &Path,
    ) -> HrlResult<Box<dyn PhotometerLink>> {
        tracing::debug!(?kind, port = %port.display(), "simulated photometer opened");
        self.state
            .lock()
            .opened
            .push(format!("photometer:{kind:?}").to_lowercase());
        Ok(Box::new(SimLink(Arc::clone(&self.state))))
    }

    fn close(&mut self) -> HrlResult<()> {
        let mut state = self.state.lock();
        state.datapixx_open = false;
        state.close_calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_presses_survive_a_timed_out_wait() {
        let mut buttons = ScriptedButtons::new([(2, Duration::from_millis(300))]);
        assert_eq!(buttons.wait_button(Duration::from_millis(100)).unwrap(), None);
        assert_eq!(
            buttons.wait_button(Duration::from_millis(500)).unwrap(),
            Some((2, Duration::from_millis(200)))
        );
        assert_eq!(buttons.pending(), 0);
    }

    #[test]
    fn cleared_presses_never_arrive() {
        let rig = SimulatedRig::new();
        rig.push_button(16, Duration::from_millis(300));
        rig.push_button(2, Duration::from_millis(10));
        rig.clear_buttons();
        assert_eq!(rig.pending_buttons(), 0);
        let mut buttons = rig.clone().open_buttons(InputKind::Keyboard).unwrap();
        assert_eq!(buttons.wait_button(Duration::from_secs(1)).unwrap(), None);
    }

    #[test]
    fn datapixx_is_shared_and_released_on_close() {
        let mut rig = SimulatedRig::new();
        let handle = rig.clone();
        rig.open_display(GraphicsKind::Datapixx, &DisplayMode::default())
            .unwrap();
        rig.open_buttons(InputKind::ResponsePixx).unwrap();
        assert!(handle.datapixx_open());
        assert_eq!(
            handle.opened(),
            ["display:datapixx", "buttons:responsepixx"]
        );
        rig.close().unwrap();
        assert!(!handle.datapixx_open());
        assert_eq!(handle.close_calls(), 1);
    }

    #[test]
    fn photometer_link_needs_a_reply() {
        let mut rig = SimulatedRig::new();
        let mut link = rig
            .open_photometer(PhotometerKind::Minolta, Path::new("/dev/null"))
            .unwrap();
        assert!(link.transact("MES").is_err());
        rig.push_reply("OK00,+12.5");
        assert_eq!(link.transact("MES").unwrap(), "OK00,+12.5");
        assert_eq!(rig.commands(), ["MES", "MES"]);
    }
}
