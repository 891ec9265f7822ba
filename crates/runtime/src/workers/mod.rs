//! Background workers owned by the runtime.
//!
//! The frame worker is the single owner of the [`skirmish_core::Engine`].
//! Everything else talks to it through [`Command`]s.

mod frame;

pub use frame::{Command, FrameStatus, FrameWorker};
