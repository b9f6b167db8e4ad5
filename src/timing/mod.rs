pub(crate) mod condition;
pub(crate) mod element;
pub(crate) mod event;
pub(crate) mod graph;
pub(crate) mod instance;
pub(crate) mod interval;
pub(crate) mod time;
