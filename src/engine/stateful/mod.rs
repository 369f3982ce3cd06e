//! Reversible state built on the trail: plain cells, counters, one-shot
//! switches, append-only lists, and bitsets. Everything here is restored by
//! the kernel when search backtracks.

mod rev_bitset;
mod rev_list;
mod rev_switch;
mod stateful_values;

pub use rev_bitset::RevBitSet;
pub use rev_list::RevList;
pub use rev_switch::RevSwitch;
pub use stateful_values::StatefulInt;
pub use stateful_values::StatefulValues;
