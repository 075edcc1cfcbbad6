pub mod slot;

pub use slot::SlotBuffer;
