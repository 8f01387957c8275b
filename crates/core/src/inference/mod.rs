pub mod domain;
pub mod inference_adapter;
pub mod infrastructure;
