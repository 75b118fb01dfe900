use ndarray::{s, Array2, Array4};
use ort::{inputs, session::Session, value::Tensor};

use crate::error::{OverlayError, Result};

/// 每个候选框使用的列数: [x1, y1, x2, y2, score, class_id]
pub const OUTPUT_COLUMNS: usize = 6;

/// 运行模型推理
///
/// # 参数
/// * `model` - ONNX模型Session
/// * `input` - 输入张量，形状应为(1, 3, height, width)
///
/// # 返回值
/// 形状为(num_boxes, 6)的二维数组。只输出5列的单类别模型，类别列补0。
pub fn run_inference(model: &mut Session, input: &Array4<f32>) -> Result<Array2<f32>> {
    let shape: Vec<usize> = input.shape().to_vec();
    let (data, _offset) = input.clone().into_raw_vec_and_offset();
    let input_tensor = Tensor::from_array(([shape[0], shape[1], shape[2], shape[3]], data))?;
    let outputs = model.run(inputs!["images" => input_tensor])?;

    let output = outputs[0].try_extract_tensor::<f32>()?;
    let shape = output.0.clone();

    // 端到端导出的YOLO模型输出形状为 [1, num_boxes, num_params]
    if shape.len() != 3 || shape[0] != 1 || shape[2] < 5 {
        return Err(OverlayError::DetectionFailed(format!(
            "模型输出形状不符合预期: {:?}",
            &shape[..]
        )));
    }

    let rows = shape[1] as usize;
    let cols = shape[2] as usize;
    let array_2d = Array2::from_shape_vec((rows, cols), output.1.to_vec())
        .map_err(|e| OverlayError::DetectionFailed(e.to_string()))?;

    let mut array = Array2::<f32>::zeros((rows, OUTPUT_COLUMNS));
    let used = cols.min(OUTPUT_COLUMNS);
    array
        .slice_mut(s![.., 0..used])
        .assign(&array_2d.slice(s![.., 0..used]));

    Ok(array)
}
