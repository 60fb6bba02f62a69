//! Frame Loop: the per-frame update that moves the camera over the scene.
//!
//! # Invariants
//! - All state a frame reads or writes is passed in explicitly through
//!   [`FrameContext`]; there are no globals.
//! - Movement and the water clock advance by fixed per-frame steps; the
//!   measured frame delta is reported but does not scale them.
//! - A ground hit never moves the camera vertically by more than
//!   `max_step_height` in one frame.

pub mod clock;
pub mod pose;
pub mod walker;

pub use clock::{FrameClock, FrameTime};
pub use pose::CameraPose;
pub use walker::{
    FrameContext, FrameReport, GroundHit, GroundOutcome, GroundProbe, WalkConfig, Walker, WaterClock,
};
