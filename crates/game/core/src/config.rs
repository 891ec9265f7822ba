/// Scheduler timing constants and tunable parameters.
///
/// All durations are in milliseconds of wall-clock time as seen by
/// [`Engine::tick`](crate::Engine::tick).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// Time between two steps of a mover.
    pub step_ms: u64,
    /// Added to the first step after a mover's pause count drops to zero.
    pub resume_extra_ms: u64,
    /// Duration of the snap-back animation after a rollback.
    pub correction_ms: u64,
    /// Longest path a mover accepts.
    pub max_path_len: usize,
    /// Delay after an AI script finishes before its turn is released.
    pub ai_grace_ms: u64,
    /// How far a reactive-targeting lock pushes its unlock time while a
    /// session is open.
    pub reactive_extension_ms: u64,
    /// Grace period between spotting a hostile and rolling initiative.
    pub combat_start_delay_ms: u64,
    /// Delay between one combat turn ending and the next one starting.
    pub turn_advance_ms: u64,
    /// Duration of an attack animation.
    pub attack_animation_ms: u64,
    /// Action points an attack costs in turn-based mode.
    pub attack_cost: u32,
    /// Sides of the initiative die.
    pub initiative_die: u32,
    pub rng_seed: u64,
}

impl SchedulerConfig {
    pub const DEFAULT_STEP_MS: u64 = 150;
    pub const DEFAULT_RESUME_EXTRA_MS: u64 = 75;
    pub const DEFAULT_CORRECTION_MS: u64 = 120;
    pub const DEFAULT_MAX_PATH_LEN: usize = 64;
    pub const DEFAULT_AI_GRACE_MS: u64 = 250;
    pub const DEFAULT_REACTIVE_EXTENSION_MS: u64 = 100;
    pub const DEFAULT_COMBAT_START_DELAY_MS: u64 = 600;
    pub const DEFAULT_TURN_ADVANCE_MS: u64 = 50;
    pub const DEFAULT_ATTACK_ANIMATION_MS: u64 = 400;
    pub const DEFAULT_ATTACK_COST: u32 = 2;
    pub const DEFAULT_INITIATIVE_DIE: u32 = 20;

    pub fn new() -> Self {
        Self {
            step_ms: Self::DEFAULT_STEP_MS,
            resume_extra_ms: Self::DEFAULT_RESUME_EXTRA_MS,
            correction_ms: Self::DEFAULT_CORRECTION_MS,
            max_path_len: Self::DEFAULT_MAX_PATH_LEN,
            ai_grace_ms: Self::DEFAULT_AI_GRACE_MS,
            reactive_extension_ms: Self::DEFAULT_REACTIVE_EXTENSION_MS,
            combat_start_delay_ms: Self::DEFAULT_COMBAT_START_DELAY_MS,
            turn_advance_ms: Self::DEFAULT_TURN_ADVANCE_MS,
            attack_animation_ms: Self::DEFAULT_ATTACK_ANIMATION_MS,
            attack_cost: Self::DEFAULT_ATTACK_COST,
            initiative_die: Self::DEFAULT_INITIATIVE_DIE,
            rng_seed: 0,
        }
    }

    pub fn with_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }

    /// Step increment used right after a pause clears.
    pub fn resume_step_ms(&self) -> u64 {
        self.step_ms + self.resume_extra_ms
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
