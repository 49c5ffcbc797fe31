pub mod buffer;
pub mod source;

pub use buffer::SampleRingBuffer;
pub use source::{CsvFileSource, SampleSource, WavFileSource};
