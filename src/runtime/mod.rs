pub(crate) mod animator;
pub(crate) mod clock;
pub(crate) mod config;
pub(crate) mod player;
pub(crate) mod queue;
pub(crate) mod sampler;
