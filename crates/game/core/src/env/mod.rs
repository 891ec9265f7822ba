//! Traits describing the collaborators around the scheduling core.
//!
//! The scheduler decides *when* things happen. What a script decides, how
//! far a creature sees, how much an attack hurts and where messages go are
//! all supplied from outside through the traits re-exported here.
mod notice;
mod oracles;
mod rng;
mod script;

pub use notice::{Notice, NotificationSink, NullSink};
pub use oracles::{AttackResolver, FlatDamage, RecordingResolver, SightRadius, VisibilityOracle};
pub use rng::{PcgRng, RngOracle, compute_seed};
pub use script::{ImmediateScripts, LivenessGuard, ScriptLiveness, ScriptRunner, TurnRequest};
