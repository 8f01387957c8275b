use std::path::Path;

use crate::device::domain::device_selection::DeviceSelection;
use crate::device::infrastructure::execution_provider::execution_providers;

/// Build an ONNX Runtime session on the selected device.
pub(crate) fn build_session(
    model_path: &Path,
    selection: DeviceSelection,
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(execution_providers(selection))?
        .commit_from_file(model_path)?;
    Ok(session)
}
