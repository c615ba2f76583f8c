/// Execution providers for the ONNX session.
///
/// An empty list means ONNX Runtime's default CPU provider. When
/// `accelerated` is set the platform's GPU provider is registered first;
/// ONNX Runtime falls back to CPU if it fails to initialize.
pub fn execution_providers(
    accelerated: bool,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    if !accelerated {
        log::info!("Running on CPU");
        return vec![];
    }
    #[cfg(target_os = "macos")]
    {
        log::info!("Running on CoreML");
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        log::info!("Running on DirectML");
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        log::info!("Running on CUDA");
        vec![ort::execution_providers::CUDAExecutionProvider::default().build()]
    }
}
