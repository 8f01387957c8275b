pub mod audio;
pub mod device;
pub mod inference;
pub mod merge;
pub mod pipeline;
pub mod render;
pub mod shared;
