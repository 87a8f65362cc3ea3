pub(crate) mod data;
pub(crate) mod generator;
pub(crate) mod style;
pub(crate) mod template;
