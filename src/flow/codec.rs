//! 浮点数 RGBA 编码
//!
//! 将 `[0, 1]` 区间的标量拆分到 4 个 8 位通道中，精度远超单个 8 位通道。
//! 第 k 个字节保存 `value * 255^k` 的小数部分在扣除更低位贡献后的余量。
//!
//! 主机端编码（写入重投影纹理）和着色器端解码必须一致，
//! 否则会表现为几何抖动。着色器端实现见 [`DECODE_WGSL`]。

/// 各字节的权重（解码时与归一化字节做点积）
pub const DECODE_WEIGHTS: [f64; 4] = [1.0, 1.0 / 255.0, 1.0 / 65025.0, 1.0 / 16581375.0];

/// 着色器端解码函数，输入为 `Rgba8Unorm` 采样得到的归一化通道值
pub const DECODE_WGSL: &str = r#"
fn rgba_to_float(rgba: vec4<f32>) -> f32 {
    return dot(rgba, vec4<f32>(1.0, 1.0 / 255.0, 1.0 / 65025.0, 1.0 / 16581375.0));
}
"#;

/// 编码 `value`（会被限制到 `[0, 1]`）为 4 个字节
pub fn encode(value: f64) -> [u8; 4] {
    let mut remainder = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let mut bytes = [0u8; 4];
    for byte in &mut bytes {
        let scaled = remainder * 255.0;
        let digit = scaled.floor().min(255.0);
        *byte = digit as u8;
        remainder = scaled - digit;
    }
    bytes
}

/// 将 4 个字节解码为 `[0, 1]` 的标量
pub fn decode(bytes: [u8; 4]) -> f64 {
    bytes
        .iter()
        .zip(DECODE_WEIGHTS.iter())
        .map(|(&b, &w)| (b as f64 / 255.0) * w)
        .sum()
}

/// 编码到目标切片（长度至少为 4）
pub fn encode_into(value: f64, out: &mut [u8]) {
    out[..4].copy_from_slice(&encode(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOLERANCE: f64 = 1.0 / (1u64 << 24) as f64;

    #[test]
    fn test_endpoints() {
        assert_eq!(encode(0.0), [0, 0, 0, 0]);
        assert_eq!(encode(1.0), [255, 0, 0, 0]);
        assert!((decode(encode(1.0)) - 1.0).abs() < TOLERANCE);
        assert_eq!(decode([0, 0, 0, 0]), 0.0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(encode(-0.5), encode(0.0));
        assert_eq!(encode(3.0), encode(1.0));
        assert_eq!(encode(f64::NAN), encode(0.0));
    }

    #[test]
    fn test_first_byte_is_coarse_value() {
        let bytes = encode(0.5);
        assert_eq!(bytes[0], 127);
        // 0.5 * 255 = 127.5，余量 0.5 进入下一个字节
        assert_eq!(bytes[1], 127);
    }

    #[test]
    fn test_encode_into() {
        let mut buf = [0u8; 8];
        encode_into(0.25, &mut buf[4..]);
        assert_eq!(&buf[4..], &encode(0.25));
        assert_eq!(&buf[..4], &[0, 0, 0, 0]);
    }

    proptest! {
        #[test]
        fn test_round_trip_precision(value in 0.0f64..=1.0) {
            let decoded = decode(encode(value));
            prop_assert!((decoded - value).abs() <= TOLERANCE);
        }

        #[test]
        fn test_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(decode(encode(lo)) <= decode(encode(hi)));
        }
    }
}
