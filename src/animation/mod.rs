pub(crate) mod animate;
pub(crate) mod motion;
pub(crate) mod refvalues;
pub(crate) mod sandwich;
pub(crate) mod segment;
pub(crate) mod spline;
pub(crate) mod value;
