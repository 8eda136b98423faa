pub(crate) mod logging;
pub(crate) mod retry;
pub(crate) mod serialization;
