use std::path::Path;

use ort::session::{builder::GraphOptimizationLevel, Session};

use crate::error::{OverlayError, Result};

/// 加载ONNX格式的检测模型
///
/// 应用三级图优化，并限制推理线程数。
///
/// # 参数
/// * `model_path` - 模型文件路径
/// * `intra_threads` - 单个算子使用的线程数
///
/// # 错误处理
/// 文件不存在或模型无法解析时返回 `DetectorUnavailable`
pub fn load_model(model_path: &Path, intra_threads: usize) -> Result<Session> {
    if !model_path.exists() {
        return Err(OverlayError::DetectorUnavailable(format!(
            "模型文件不存在: {}",
            model_path.display()
        )));
    }

    build_session(model_path, intra_threads)
        .map_err(|e| OverlayError::DetectorUnavailable(e.to_string()))
}

fn build_session(
    model_path: &Path,
    intra_threads: usize,
) -> std::result::Result<Session, ort::Error> {
    let model = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(model_path)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_unavailable() {
        let err = load_model(Path::new("does/not/exist.onnx"), 1).unwrap_err();
        assert!(matches!(err, OverlayError::DetectorUnavailable(_)));
    }
}
