mod continuity_counter;
mod crc32;
mod pid;
mod stream_type;
mod timestamp;

pub mod ts;

pub use continuity_counter::ContinuityCounter;
pub use crc32::crc32_mpeg2;
pub use pid::Pid;
pub use stream_type::StreamType;
pub use timestamp::{Clock, PCR, PtsDts, Timestamp};
