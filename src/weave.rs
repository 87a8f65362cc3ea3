pub(crate) mod builder;
pub(crate) mod grid;
pub(crate) mod timing;
