//! Psychophysics rig access and trial bookkeeping.
//!
//! [`Hrl`] is the entry point: open it from a [`SessionConfig`] and a
//! [`Rig`], then run trials against its device slots while reading design
//! rows and appending result rows. A session resumes where its result file
//! left off.

pub use hrl_core as core;
pub use hrl_devices as devices;
pub use hrl_matrix as matrix;
pub use hrl_session as session;
pub use hrl_timing as timing;

pub use hrl_core::{
    Graphics, GraphicsKind, HrlError, HrlResult, Input, InputKind, Key, Photometer,
    PhotometerKind, Rig,
};
pub use hrl_devices::SimulatedRig;
pub use hrl_matrix::{DesignReader, ResultWriter, Row};
pub use hrl_session::{Hrl, SessionConfig};
