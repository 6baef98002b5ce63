//! Record mutation: modification descriptors and the update executor.

mod changes;
pub(crate) mod executor;

pub use changes::{Change, Modifications};
