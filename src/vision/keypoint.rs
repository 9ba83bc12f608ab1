/// 图像特征点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPoint {
    /// 原始图像坐标（已换算回第0层）
    pub x: f32,
    pub y: f32,
    /// 角点响应强度
    pub response: f32,
    /// 主方向（弧度）
    pub angle: f32,
    /// 检出所在的金字塔层
    pub octave: usize,
}

impl KeyPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            response: 0.0,
            angle: 0.0,
            octave: 0,
        }
    }
}

/// 256位二进制描述子，按32字节存放
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptor(pub [u8; 32]);

impl Descriptor {
    /// 两个描述子之间的汉明距离
    pub fn hamming_distance(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// 一幅图像的特征检测结果
#[derive(Debug, Clone, Default)]
pub struct Features {
    pub keypoints: Vec<KeyPoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// 一对描述子的匹配
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMatch {
    /// 查询图中的特征索引
    pub query_idx: usize,
    /// 训练图中的特征索引
    pub train_idx: usize,
    /// 描述子汉明距离
    pub distance: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_distance_counts_differing_bits() {
        let a = Descriptor([0u8; 32]);
        let mut bytes = [0u8; 32];
        bytes[0] = 0b1010_1010;
        bytes[31] = 0b0000_0001;
        let b = Descriptor(bytes);
        assert_eq!(a.hamming_distance(&b), 5);
        assert_eq!(b.hamming_distance(&b), 0);
    }
}
