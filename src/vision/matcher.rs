use crate::vision::keypoint::{FeatureMatch, Features};
use log::debug;

/// 暴力汉明匹配：为查询图每个描述子找训练图中最近的一个
pub fn match_descriptors(query: &Features, train: &Features) -> Vec<FeatureMatch> {
    let mut matches = Vec::with_capacity(query.len());

    for (qi, qd) in query.descriptors.iter().enumerate() {
        let mut best: Option<FeatureMatch> = None;
        for (ti, td) in train.descriptors.iter().enumerate() {
            let distance = qd.hamming_distance(td);
            if best.is_none_or(|m| distance < m.distance) {
                best = Some(FeatureMatch {
                    query_idx: qi,
                    train_idx: ti,
                    distance,
                });
            }
        }
        if let Some(m) = best {
            matches.push(m);
        }
    }

    matches
}

/// 按距离升序排序后只保留最优的一部分
pub fn retain_best_matches(mut matches: Vec<FeatureMatch>, keep_ratio: f32) -> Vec<FeatureMatch> {
    matches.sort_by_key(|m| m.distance);
    let keep = (matches.len() as f32 * keep_ratio) as usize;
    matches.truncate(keep);
    debug!("匹配筛选: 保留 {} 对", matches.len());
    matches
}
