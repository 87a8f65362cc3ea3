pub(crate) mod cpu;
pub(crate) mod host;
pub(crate) mod session;
