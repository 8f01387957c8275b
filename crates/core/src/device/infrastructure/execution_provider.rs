use crate::device::domain::device_selection::DeviceSelection;

/// ONNX execution providers for the selected device.
///
/// Host runs use the default CPU provider. Accelerator runs use the
/// platform provider, falling back to CPU if it is unavailable at runtime.
pub fn execution_providers(
    selection: DeviceSelection,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    if !selection.is_accelerator() {
        return vec![];
    }
    accelerator_providers()
}

fn accelerator_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(all(not(any(target_os = "macos", target_os = "windows")), feature = "cuda"))]
    {
        vec![ort::execution_providers::CUDAExecutionProvider::default().build()]
    }
    #[cfg(all(not(any(target_os = "macos", target_os = "windows")), not(feature = "cuda")))]
    {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_uses_default_provider() {
        assert!(execution_providers(DeviceSelection::HOST).is_empty());
    }
}
