pub mod graphics;
pub mod input;
pub mod photometer;
pub mod sim;

pub use graphics::{Encoding, LuminanceCanvas, Lut};
pub use input::{ButtonPoll, ButtonReader, PollingButtons};
pub use photometer::{
    LinePhotometer, Protocol, SerialLink, DEFAULT_PORT, DEFAULT_REPLY_TIMEOUT,
};
pub use sim::{ScriptedButtons, SimulatedRig};
