pub mod cue_renderer;
pub mod paragraph_renderer;
pub mod render_mode;
pub mod transcript_writer;
pub mod unresolved_policy;
