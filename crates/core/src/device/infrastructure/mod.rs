pub mod accelerator_gate;
pub mod execution_provider;
pub mod nvidia_smi_probe;
