pub mod ease;
pub mod param;
pub mod sequencer;
pub mod timeline;
pub mod value;
