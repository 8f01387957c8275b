pub mod device_selection;
pub mod memory_probe;
