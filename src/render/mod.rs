pub(crate) mod canvas;
pub(crate) mod composite;
pub(crate) mod cpu;
pub(crate) mod dirty;
pub(crate) mod graphics;
pub(crate) mod manager;
pub(crate) mod paint;
pub(crate) mod tile;
