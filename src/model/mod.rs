pub(crate) mod document;
pub(crate) mod scene;
pub(crate) mod traits;
