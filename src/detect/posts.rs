//! 检测结果后处理
//!
//! 置信度过滤、数量截断，以及模型输出使用的非极大值抑制。

use crate::detect::bounds::DetectionRecord;
use crate::detect::params::{DetectionParameters, MaxDetections, ScoreThreshold};

/// 检测器返回结果的顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputOrder {
    /// 按置信度从高到低排列
    #[default]
    Descending,
    /// 无序，截断前需要先排序
    Unordered,
}

/// 只保留置信度不低于阈值的检测结果，保持原有顺序
pub fn filter_by_score(
    detections: Vec<DetectionRecord>,
    threshold: ScoreThreshold,
) -> Vec<DetectionRecord> {
    detections
        .into_iter()
        .filter(|d| threshold.accepts(d.score))
        .collect()
}

/// 截断为前 `limit` 个检测结果
pub fn cap_detections(
    mut detections: Vec<DetectionRecord>,
    limit: MaxDetections,
) -> Vec<DetectionRecord> {
    detections.truncate(limit.value());
    detections
}

/// 按置信度降序排列（稳定排序，同分时保持检测器顺序）
pub fn sort_by_score(detections: &mut [DetectionRecord]) {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// 完整的后处理：过滤 -> (必要时排序) -> 截断
///
/// # 参数
/// * `detections` - 检测器原始输出
/// * `params` - 当前的阈值与数量上限
/// * `order` - 检测器声明的输出顺序
///
/// # 返回值
/// 可以直接交给渲染器的检测结果
pub fn post_process(
    detections: Vec<DetectionRecord>,
    params: &DetectionParameters,
    order: OutputOrder,
) -> Vec<DetectionRecord> {
    let mut kept = filter_by_score(detections, params.score_threshold);
    if order == OutputOrder::Unordered {
        sort_by_score(&mut kept);
    }
    cap_detections(kept, params.max_detections)
}

/// 应用非极大值抑制
///
/// 输入需已按置信度降序排列，同类别中与更高分框重叠度超过阈值的框会被去除。
pub fn apply_nms(detections: Vec<DetectionRecord>, nms_threshold: f32) -> Vec<DetectionRecord> {
    let mut suppressed = vec![false; detections.len()];
    let mut result = Vec::with_capacity(detections.len());

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_name != detections[j].class_name {
                continue;
            }
            if detections[i].bbox.iou(&detections[j].bbox) >= nms_threshold {
                suppressed[j] = true;
            }
        }
        result.push(detections[i].clone());
    }

    result
}
