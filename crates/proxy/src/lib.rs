//! Protocol core and I/O for the fragmentation proxy pair: the capability
//! signal, the fragmenter, the reassembler, upstream exchange and the
//! UDP/TCP listener front-ends.

pub mod fragment;
pub mod handlers;
pub mod listen;
pub mod reassembly;
pub mod signal;
pub mod upstream;
