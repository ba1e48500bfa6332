mod adaptation_field;
mod packet;
mod pat;
mod pes;
mod pmt;
mod psi;

pub use adaptation_field::*;
pub use packet::*;
pub use pat::*;
pub use pes::*;
pub use pmt::*;
pub use psi::*;
