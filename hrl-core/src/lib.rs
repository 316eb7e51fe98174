pub mod device;
pub mod error;
pub mod key;

pub use device::{
    ButtonSource, Display, DisplayMode, Graphics, GraphicsKind, Input, InputKind, Photometer,
    PhotometerKind, PhotometerLink, Rig,
};
pub use error::{HrlError, HrlResult};
pub use key::{Key, KeyMap, KeyboardMap, ResponsePixxMap};
