use crate::error::HrlResult;
use crate::key::Key;
use std::path::Path;
use std::time::Duration;

/// Graphics devices a session can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsKind {
    Gpu,
    Datapixx,
}

/// Input devices a session can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Keyboard,
    ResponsePixx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotometerKind {
    OptiCal,
    Minolta,
}

/// Parses a device flag. Anything unrecognized selects no device.
fn parse_flag<K: Copy>(flag: Option<&str>, table: &[(&str, K)], slot: &str) -> Option<K> {
    let flag = flag?;
    let found = table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(flag))
        .map(|(_, kind)| *kind);
    if found.is_none() {
        tracing::warn!(slot, flag, "unrecognized device flag, leaving slot empty");
    }
    found
}

impl GraphicsKind {
    pub fn from_flag(flag: Option<&str>) -> Option<Self> {
        parse_flag(
            flag,
            &[("gpu", Self::Gpu), ("datapixx", Self::Datapixx)],
            "graphics",
        )
    }

    /// Whether the device needs the shared DATAPixx handle.
    pub fn uses_datapixx(&self) -> bool {
        matches!(self, Self::Datapixx)
    }
}

impl InputKind {
    pub fn from_flag(flag: Option<&str>) -> Option<Self> {
        parse_flag(
            flag,
            &[("keyboard", Self::Keyboard), ("responsepixx", Self::ResponsePixx)],
            "inputs",
        )
    }

    pub fn uses_datapixx(&self) -> bool {
        matches!(self, Self::ResponsePixx)
    }
}

impl PhotometerKind {
    pub fn from_flag(flag: Option<&str>) -> Option<Self> {
        parse_flag(
            flag,
            &[("optical", Self::OptiCal), ("minolta", Self::Minolta)],
            "photometer",
        )
    }
}

/// Screen geometry and buffering requested for the graphics device.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    /// Background luminance in `[0, 1]`.
    pub background: f32,
    pub fullscreen: bool,
    pub double_buffer: bool,
    pub screen: u32,
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            background: 0.0,
            fullscreen: false,
            double_buffer: true,
            screen: 0,
        }
    }
}

/// Drawing in luminance units, independent of how the device encodes them.
pub trait Graphics {
    fn size(&self) -> (u32, u32);
    fn background(&self) -> f32;
    fn change_background(&mut self, luminance: f32) -> HrlResult<()>;
    fn set_pixel(&mut self, x: u32, y: u32, luminance: f32) -> HrlResult<()>;
    fn get_pixel(&self, x: u32, y: u32) -> HrlResult<f32>;
    fn fill_rect(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        luminance: f32,
    ) -> HrlResult<()>;

    /// Swaps buffers, showing everything drawn since the last flip.
    fn flip(&mut self) -> HrlResult<()>;

    /// Seconds between recent flips, oldest first. Empty for devices that
    /// do not time their flips.
    fn frame_intervals(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// Reading a subject's response.
pub trait Input {
    /// Waits for a button in `allowed` (any button if empty) for at most
    /// `timeout`. Returns `(None, timeout)` when nothing acceptable arrived.
    fn read_button(
        &mut self,
        allowed: &[Key],
        timeout: Duration,
    ) -> HrlResult<(Option<Key>, Duration)>;
}

pub trait Photometer {
    /// Blocks until the next luminance sample (cd/m²) is available.
    fn read_luminance(&mut self) -> HrlResult<f64>;

    fn read_samples(&mut self, count: usize) -> HrlResult<Vec<f64>> {
        (0..count).map(|_| self.read_luminance()).collect()
    }
}

/// Vendor side of a display: receives fully encoded RGBA frames.
pub trait Display {
    fn present(&mut self, rgba: &[u8], width: u32, height: u32) -> HrlResult<()>;
}

/// Vendor side of an input device.
pub trait ButtonSource {
    /// Blocks for at most `timeout`. Returns the raw code of the next button
    /// press and how long the wait took, or `None` if the wait timed out.
    fn wait_button(&mut self, timeout: Duration) -> HrlResult<Option<(u32, Duration)>>;
}

/// Vendor side of a photometer: a command/reply channel.
pub trait PhotometerLink {
    fn transact(&mut self, command: &str) -> HrlResult<String>;
}

impl<D: Display + ?Sized> Display for Box<D> {
    fn present(&mut self, rgba: &[u8], width: u32, height: u32) -> HrlResult<()> {
        (**self).present(rgba, width, height)
    }
}

impl<S: ButtonSource + ?Sized> ButtonSource for Box<S> {
    fn wait_button(&mut self, timeout: Duration) -> HrlResult<Option<(u32, Duration)>> {
        (**self).wait_button(timeout)
    }
}

impl<L: PhotometerLink + ?Sized> PhotometerLink for Box<L> {
    fn transact(&mut self, command: &str) -> HrlResult<String> {
        (**self).transact(command)
    }
}

/// The hardware a session runs on. Hands out device backends and owns
/// whatever vendor handles they share.
pub trait Rig {
    fn open_display(
        &mut self,
        kind: GraphicsKind,
        mode: &DisplayMode,
    ) -> HrlResult<Box<dyn Display>>;
    fn open_buttons(&mut self, kind: InputKind) -> HrlResult<Box<dyn ButtonSource>>;
    fn open_photometer(
        &mut self,
        kind: PhotometerKind,
        port: &Path,
    ) -> HrlResult<Box<dyn PhotometerLink>>;

    /// Releases every vendor handle. Called once per session.
    fn close(&mut self) -> HrlResult<()>;
}
