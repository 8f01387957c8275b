pub mod merged_segment;
pub mod segment_merger;
