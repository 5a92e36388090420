//! Integration tests for the frame codec and the buffered deframer

mod codec_processing;
mod continuation;
mod error_handling;
mod frame_building;
mod frame_parsing;
mod protocol_frames;
