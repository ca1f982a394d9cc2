//! Internal implementation details.

pub(crate) mod register;
pub(crate) mod volatile;
