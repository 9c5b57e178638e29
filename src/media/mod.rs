// SYNOID Bench Media Modules
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod audio_io;
pub mod frame_sampler;
pub mod muxer;
pub mod probe;
pub mod webcam;

pub use audio_io::AudioBuffer;
pub use frame_sampler::{FrameSampler, FrameSequence};
pub use probe::MediaInfo;
