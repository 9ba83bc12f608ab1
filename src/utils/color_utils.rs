use nalgebra::Vector3;

/// RGB颜色类型，分量范围 [0.0, 1.0]
pub type Color = Vector3<f32>;

/// 标准gamma值
const GAMMA: f32 = 2.2;

/// 应用gamma矫正，将线性RGB值转换为sRGB空间
pub fn apply_gamma_correction(linear_color: &Color) -> Color {
    let inv_gamma = 1.0 / GAMMA;
    Color::new(
        linear_color.x.powf(inv_gamma),
        linear_color.y.powf(inv_gamma),
        linear_color.z.powf(inv_gamma),
    )
}

/// 将线性RGB值转换为u8数组，可选gamma矫正
pub fn linear_rgb_to_u8(linear_color: &Color, apply_gamma: bool) -> [u8; 3] {
    let display_color = if apply_gamma {
        apply_gamma_correction(linear_color)
    } else {
        *linear_color
    };

    [
        (display_color.x.clamp(0.0, 1.0) * 255.0).round() as u8,
        (display_color.y.clamp(0.0, 1.0) * 255.0).round() as u8,
        (display_color.z.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_correction_brightens_midtones() {
        let corrected = apply_gamma_correction(&Color::new(0.5, 0.5, 0.5));
        assert!(corrected.x > 0.5);
    }

    #[test]
    fn linear_rgb_to_u8_clamps_range() {
        assert_eq!(linear_rgb_to_u8(&Color::new(-1.0, 0.0, 2.0), false), [
            0, 0, 255
        ]);
    }
}
