pub(crate) mod edges;
pub(crate) mod points;
pub(crate) mod sample;
