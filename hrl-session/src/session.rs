use crate::config::SessionConfig;
use hrl_core::{
    Graphics, GraphicsKind, HrlError, HrlResult, Input, InputKind, KeyboardMap, Photometer,
    PhotometerKind, ResponsePixxMap, Rig,
};
use hrl_devices::{ButtonReader, Encoding, LinePhotometer, LuminanceCanvas, Lut, Protocol};
use hrl_matrix::{DesignReader, ResultWriter, Row};
use hrl_timing::{DEFAULT_MIN_RATE_HZ, RateSummary};

/// One experiment run: the devices it drives and the files it keeps.
///
/// Each device slot is `None` unless the config selected a known device.
/// Resources are released by [`Hrl::close`], or on drop if the caller never
/// got that far.
pub struct Hrl {
    pub graphics: Option<Box<dyn Graphics>>,
    pub inputs: Option<Box<dyn Input>>,
    pub photometer: Option<Box<dyn Photometer>>,
    /// Scratch row for the current trial, written by
    /// [`Hrl::write_result_line`].
    pub results: Row,

    rig: Box<dyn Rig>,
    result_writer: Option<ResultWriter>,
    designs: Option<DesignReader>,
    start_trial: usize,
    closed: bool,
}

impl Hrl {
    pub fn open<R: Rig + 'static>(config: &SessionConfig, rig: R) -> HrlResult<Self> {
        config.validate()?;

        // from here on, an early return drops `hrl` and releases what was opened
        let mut hrl = Hrl {
            graphics: None,
            inputs: None,
            photometer: None,
            results: Row::new(),
            rig: Box::new(rig),
            result_writer: None,
            designs: None,
            start_trial: 0,
            closed: false,
        };

        if let Some(kind) = GraphicsKind::from_flag(config.graphics.as_deref()) {
            let lut = config.lut.as_deref().map(Lut::load).transpose()?;
            let mode = config.display_mode();
            let display = hrl.rig.open_display(kind, &mode)?;
            let canvas = LuminanceCanvas::new(display, &mode, Encoding::for_kind(kind), lut)?;
            hrl.graphics = Some(Box::new(canvas));
        }

        if let Some(kind) = InputKind::from_flag(config.inputs.as_deref()) {
            let source = hrl.rig.open_buttons(kind)?;
            let reader: Box<dyn Input> = match kind {
                InputKind::Keyboard => Box::new(ButtonReader::new(source, KeyboardMap)),
                InputKind::ResponsePixx => Box::new(ButtonReader::new(source, ResponsePixxMap)),
            };
            hrl.inputs = Some(reader);
        }

        if let Some(kind) = PhotometerKind::from_flag(config.photometer.as_deref()) {
            let link = hrl.rig.open_photometer(kind, &config.photometer_port)?;
            hrl.photometer = Some(Box::new(LinePhotometer::new(
                link,
                Protocol::for_kind(kind),
            )));
        }

        if let Some(path) = &config.results {
            let headers = config
                .result_headers
                .clone()
                .ok_or(HrlError::MissingResultHeaders)?;
            let writer = ResultWriter::open(path, headers)?;
            hrl.start_trial = writer.existing_rows();
            hrl.result_writer = Some(writer);
        }

        if let Some(path) = &config.design {
            let mut designs = DesignReader::open(path)?;
            designs.skip_rows(hrl.start_trial)?;
            hrl.designs = Some(designs);
        }

        tracing::info!(
            graphics = hrl.graphics.is_some(),
            inputs = hrl.inputs.is_some(),
            photometer = hrl.photometer.is_some(),
            start_trial = hrl.start_trial,
            "session opened"
        );
        Ok(hrl)
    }

    /// Remaining design rows, if a design file was given.
    pub fn designs(&mut self) -> Option<&mut DesignReader> {
        self.designs.as_mut()
    }

    /// Next design row; `None` when the design is done or there is none.
    pub fn next_design(&mut self) -> HrlResult<Option<Row>> {
        match self.designs.as_mut() {
            Some(designs) => designs.next_row(),
            None => Ok(None),
        }
    }

    /// Trials already in the result file when the session opened.
    pub fn start_trial(&self) -> usize {
        self.start_trial
    }

    /// Zero-based index of the next result row to be written.
    pub fn trial_index(&self) -> usize {
        self.result_writer
            .as_ref()
            .map_or(self.start_trial, ResultWriter::row_count)
    }

    pub fn result_headers(&self) -> Option<&[String]> {
        self.result_writer.as_ref().map(ResultWriter::headers)
    }

    /// Writes [`Hrl::results`] as the next result row. The row is kept, so
    /// values not set for the next trial carry over.
    pub fn write_result_line(&mut self) -> HrlResult<()> {
        let row = std::mem::take(&mut self.results);
        let written = self.write_result(&row);
        self.results = row;
        written
    }

    pub fn write_result(&mut self, row: &Row) -> HrlResult<()> {
        match self.result_writer.as_mut() {
            Some(writer) => writer.write_row(row),
            None if self.closed => Err(HrlError::Closed),
            None => Err(HrlError::Config(
                "no result file was configured for this session".into(),
            )),
        }
    }

    /// Refresh rate over the display's recent flips, or `None` before there
    /// are any.
    pub fn refresh_rate(&self, min_rate_hz: f64) -> Option<RateSummary> {
        let deltas = self.graphics.as_ref()?.frame_intervals();
        if deltas.is_empty() {
            return None;
        }
        Some(RateSummary::from_deltas(&deltas, min_rate_hz))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Releases devices, files and the rig. Every resource is released even
    /// if an earlier one fails; the first failure is returned. Closing an
    /// already closed session does nothing.
    pub fn close(&mut self) -> HrlResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(rate) = self.refresh_rate(DEFAULT_MIN_RATE_HZ) {
            tracing::info!(
                frames = rate.count,
                rejected = rate.rejected,
                mean_hz = rate.mean_hz,
                std_hz = rate.std_hz,
                "display refresh rate"
            );
        }
        self.graphics = None;
        self.inputs = None;
        self.photometer = None;
        self.designs = None;

        let mut first_err = None;
        if let Some(mut writer) = self.result_writer.take() {
            if let Err(e) = writer.close() {
                first_err.get_or_insert(e);
            }
        }
        if let Err(e) = self.rig.close() {
            first_err.get_or_insert(e);
        }
        tracing::info!("session closed");
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for Hrl {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "session did not close cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrl_core::Key;
    use hrl_devices::SimulatedRig;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn default_config_fills_graphics_and_inputs() {
        let rig = SimulatedRig::new();
        let hrl = Hrl::open(&SessionConfig::default(), rig.clone()).unwrap();
        assert!(hrl.graphics.is_some());
        assert!(hrl.inputs.is_some());
        assert!(hrl.photometer.is_none());
        assert_eq!(rig.opened(), ["display:gpu", "buttons:keyboard"]);
        assert!(!rig.datapixx_open());
    }

    #[test]
    fn refresh_rate_comes_from_display_flips() {
        let config = SessionConfig {
            width: 4,
            height: 4,
            ..SessionConfig::default()
        };
        let mut hrl = Hrl::open(&config, SimulatedRig::new()).unwrap();
        assert_eq!(hrl.refresh_rate(0.0), None);

        let graphics = hrl.graphics.as_mut().unwrap();
        for _ in 0..3 {
            graphics.flip().unwrap();
        }
        let rate = hrl.refresh_rate(0.0).unwrap();
        assert_eq!(rate.count + rate.rejected, 3);

        let headless = Hrl::open(&SessionConfig::files_only(), SimulatedRig::new()).unwrap();
        assert_eq!(headless.refresh_rate(0.0), None);
    }

    #[test]
    fn unknown_flags_leave_slots_empty() {
        let config = SessionConfig {
            graphics: Some("vulkan".into()),
            inputs: Some("mouse".into()),
            photometer: Some("spectro".into()),
            ..SessionConfig::default()
        };
        let rig = SimulatedRig::new();
        let hrl = Hrl::open(&config, rig.clone()).unwrap();
        assert!(hrl.graphics.is_none() && hrl.inputs.is_none() && hrl.photometer.is_none());
        assert!(rig.opened().is_empty());
    }

    #[test]
    fn response_box_session_shares_datapixx() {
        let config = SessionConfig {
            graphics: Some("datapixx".into()),
            inputs: Some("responsepixx".into()),
            photometer: Some("minolta".into()),
            width: 8,
            height: 8,
            ..SessionConfig::default()
        };
        let rig = SimulatedRig::new();
        rig.push_button(8, Duration::from_millis(400));
        rig.push_reply("OK00,+88.0");
        let mut hrl = Hrl::open(&config, rig.clone()).unwrap();
        assert!(rig.datapixx_open());

        let inputs = hrl.inputs.as_mut().unwrap();
        assert_eq!(
            inputs.read_button(&[], Duration::from_secs(1)).unwrap(),
            (Some(Key::Down), Duration::from_millis(400))
        );
        let photometer = hrl.photometer.as_mut().unwrap();
        assert_eq!(photometer.read_luminance().unwrap(), 88.0);

        hrl.close().unwrap();
        assert!(!rig.datapixx_open());
        hrl.close().unwrap();
        assert_eq!(rig.close_calls(), 1);
    }

    #[test]
    fn missing_headers_fail_before_devices_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            results: Some(dir.path().join("r.txt")),
            ..SessionConfig::default()
        };
        let rig = SimulatedRig::new();
        assert!(matches!(
            Hrl::open(&config, rig.clone()),
            Err(HrlError::MissingResultHeaders)
        ));
        assert!(rig.opened().is_empty());
        assert!(!dir.path().join("r.txt").exists());
    }

    #[test]
    fn failed_open_still_releases_the_rig() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::default().with_design(dir.path().join("missing.txt"));
        let rig = SimulatedRig::new();
        assert!(Hrl::open(&config, rig.clone()).is_err());
        assert_eq!(rig.close_calls(), 1);
    }

    #[test]
    fn results_row_is_reused_between_trials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.txt");
        let config = SessionConfig::files_only().with_results(&path, ["Trial", "Block"]);
        let mut hrl = Hrl::open(&config, SimulatedRig::new()).unwrap();
        hrl.results.set("Block", 1).set("Trial", 0);
        hrl.write_result_line().unwrap();
        hrl.results.set("Trial", 1);
        hrl.write_result_line().unwrap();
        assert_eq!(hrl.trial_index(), 2);
        hrl.close().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Trial Block\n0 1\n1 1\n"
        );
        assert!(matches!(
            hrl.write_result_line(),
            Err(HrlError::Closed)
        ));
    }

    #[test]
    fn writing_without_a_result_file_fails() {
        let mut hrl = Hrl::open(&SessionConfig::files_only(), SimulatedRig::new()).unwrap();
        assert!(matches!(
            hrl.write_result(&Row::new().with("A", 1)),
            Err(HrlError::Config(_))
        ));
        assert!(hrl.designs().is_none());
        assert_eq!(hrl.next_design().unwrap(), None);
    }
}
