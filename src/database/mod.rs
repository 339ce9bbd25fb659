pub mod intset;
pub mod sds;

pub use intset::{Encoding, IntSet, IntSetIter};
pub use sds::Sds;
