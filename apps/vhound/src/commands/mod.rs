pub mod collect;
pub mod process;
pub mod sync;
