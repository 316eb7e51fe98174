pub mod lut;

use hrl_core::{Display, DisplayMode, Graphics, GraphicsKind, HrlError, HrlResult};
use hrl_timing::{FrameLog, HighPrecisionTimer, Timer};
use std::path::Path;
use tiny_skia::Pixmap;

pub use lut::Lut;

/// How a luminance in `[0, 1]` is packed into an RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// 8-bit grey on all three channels.
    Grey8,
    /// 16-bit luminance: red carries the high byte, green the low byte.
    Mono16,
}

impl Encoding {
    pub fn for_kind(kind: GraphicsKind) -> Self {
        match kind {
            GraphicsKind::Gpu => Encoding::Grey8,
            GraphicsKind::Datapixx => Encoding::Mono16,
        }
    }

    #[inline]
    pub fn rgba(&self, luminance: f32) -> [u8; 4] {
        let l = luminance.clamp(0.0, 1.0);
        match self {
            Encoding::Grey8 => {
                let v = (l * 255.0).round() as u8;
                [v, v, v, 255]
            }
            Encoding::Mono16 => {
                let v = (l * 65535.0).round() as u16;
                [(v >> 8) as u8, (v & 0xff) as u8, 0, 255]
            }
        }
    }

    /// Inverse of [`Encoding::rgba`], up to quantization.
    pub fn luminance(&self, rgba: [u8; 4]) -> f32 {
        match self {
            Encoding::Grey8 => rgba[0] as f32 / 255.0,
            Encoding::Mono16 => (((rgba[0] as u16) << 8) | rgba[1] as u16) as f32 / 65535.0,
        }
    }
}

/// Luminance frame buffer in front of a [`Display`].
///
/// Drawing happens in a floating point back buffer. `flip` pushes it through
/// the lookup table, encodes it into the RGBA frame and presents that. With
/// double buffering the back buffer is then reset to the background; without
/// it every draw call is presented straight away.
pub struct LuminanceCanvas<D> {
    display: D,
    width: u32,
    height: u32,
    background: f32,
    double_buffer: bool,
    encoding: Encoding,
    lut: Option<Lut>,
    back: Vec<f32>,
    frame: Pixmap,
    timer: HighPrecisionTimer,
    last_flip: Option<u64>,
    frames: FrameLog,
}

impl<D: Display> LuminanceCanvas<D> {
    pub fn new(
        display: D,
        mode: &DisplayMode,
        encoding: Encoding,
        lut: Option<Lut>,
    ) -> HrlResult<Self> {
        check_luminance(mode.background)?;
        let frame = Pixmap::new(mode.width, mode.height).ok_or_else(|| {
            HrlError::Device(format!(
                "cannot allocate a {}x{} frame",
                mode.width, mode.height
            ))
        })?;
        let mut canvas = Self {
            display,
            width: mode.width,
            height: mode.height,
            background: mode.background,
            double_buffer: mode.double_buffer,
            encoding,
            lut,
            back: vec![mode.background; (mode.width * mode.height) as usize],
            frame,
            timer: HighPrecisionTimer::new(),
            last_flip: None,
            frames: FrameLog::default(),
        };
        tracing::info!(
            width = mode.width,
            height = mode.height,
            ?encoding,
            double_buffer = mode.double_buffer,
            "graphics ready"
        );
        canvas.present()?;
        Ok(canvas)
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The last frame sent to the display, as the device received it.
    pub fn frame(&self) -> &Pixmap {
        &self.frame
    }

    pub fn save_png(&self, path: &Path) -> HrlResult<()> {
        self.frame
            .save_png(path)
            .map_err(|e| HrlError::Device(format!("saving {}: {e}", path.display())))
    }

    fn index(&self, x: u32, y: u32) -> HrlResult<usize> {
        if x >= self.width || y >= self.height {
            return Err(HrlError::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok((y * self.width + x) as usize)
    }

    fn encode(&mut self) {
        let lut = self.lut.as_ref();
        let encoding = self.encoding;
        for (px, &l) in self.frame.data_mut().chunks_exact_mut(4).zip(&self.back) {
            let l = lut.map_or(l, |t| t.map(l));
            px.copy_from_slice(&encoding.rgba(l));
        }
    }

    fn present(&mut self) -> HrlResult<()> {
        self.encode();
        self.display.present(self.frame.data(), self.width, self.height)?;
        let now = self.timer.now();
        if let Some(prev) = self.last_flip.replace(now) {
            self.frames.record_frame(self.timer.elapsed(prev));
        }
        Ok(())
    }

    fn after_draw(&mut self) -> HrlResult<()> {
        if self.double_buffer {
            Ok(())
        } else {
            self.present()
        }
    }
}

fn check_luminance(l: f32) -> HrlResult<()> {
    if (0.0..=1.0).contains(&l) {
        Ok(())
    } else {
        Err(HrlError::LuminanceOutOfRange(l))
    }
}

impl<D: Display> Graphics for LuminanceCanvas<D> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn background(&self) -> f32 {
        self.background
    }

    fn change_background(&mut self, luminance: f32) -> HrlResult<()> {
        check_luminance(luminance)?;
        self.background = luminance;
        self.back.fill(luminance);
        self.after_draw()
    }

    fn set_pixel(&mut self, x: u32, y: u32, luminance: f32) -> HrlResult<()> {
        check_luminance(luminance)?;
        let idx = self.index(x, y)?;
        self.back[idx] = luminance;
        self.after_draw()
    }

    fn get_pixel(&self, x: u32, y: u32) -> HrlResult<f32> {
        Ok(self.back[self.index(x, y)?])
    }

    fn fill_rect(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        luminance: f32,
    ) -> HrlResult<()> {
        check_luminance(luminance)?;
        if width == 0 || height == 0 {
            return Ok(());
        }
        // both corners must be on screen
        self.index(x, y)?;
        self.index(x.saturating_add(width - 1), y.saturating_add(height - 1))?;
        for row in y..y + height {
            let start = (row * self.width + x) as usize;
            self.back[start..start + width as usize].fill(luminance);
        }
        self.after_draw()
    }

    fn flip(&mut self) -> HrlResult<()> {
        self.present()?;
        if self.double_buffer {
            self.back.fill(self.background);
        }
        Ok(())
    }

    fn frame_intervals(&self) -> Vec<f64> {
        self.frames.deltas()
    }
}
