//! Convenient mod collecting the generic stream blocks for import.
pub use crate::constant_source::ConstantSource;
pub use crate::convert::{FloatToComplex, Map};
pub use crate::debug_sink::DebugSink;
pub use crate::fft_stream::FftStream;
pub use crate::file_sink::{FileSink, NCFileSink};
pub use crate::file_source::FileSource;
pub use crate::null_sink::NullSink;
pub use crate::rational_resampler::RationalResampler;
pub use crate::tee::Tee;
pub use crate::vector_sink::VectorSink;
pub use crate::vector_source::{VectorSource, VectorSourceBuilder};
pub use crate::writer_sink::WriterSink;

pub use crate::phy::control::ControlState;
pub use crate::phy::encoder::{PhyEncoder, SubchannelEncoder};
