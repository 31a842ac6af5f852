//! 位置の線形補間とクォータニオンの正規化線形補間

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

pub fn lerp_position(a: &[f32; 3], b: &[f32; 3], t: f32) -> [f32; 3] {
    [
        lerp(a[0], b[0], t),
        lerp(a[1], b[1], t),
        lerp(a[2], b[2], t),
    ]
}

/// 最短経路のNLERP。結果は常に単位クォータニオン（入力が零ベクトルでなければ）
pub fn nlerp(a: &[f32; 4], b: &[f32; 4], t: f32) -> [f32; 4] {
    // shortest path: dot < 0 なら b を反転
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];
    let sign = if dot < 0.0 { -1.0 } else { 1.0 };

    let mut result = [
        (1.0 - t) * a[0] + t * sign * b[0],
        (1.0 - t) * a[1] + t * sign * b[1],
        (1.0 - t) * a[2] + t * sign * b[2],
        (1.0 - t) * a[3] + t * sign * b[3],
    ];

    let len = (result[0] * result[0]
        + result[1] * result[1]
        + result[2] * result[2]
        + result[3] * result[3])
        .sqrt();
    if len > 0.0 {
        for v in &mut result {
            *v /= len;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_3(a: &[f32; 3], b: &[f32; 3], eps: f32) -> bool {
        (a[0] - b[0]).abs() < eps && (a[1] - b[1]).abs() < eps && (a[2] - b[2]).abs() < eps
    }

    fn quat_length(q: &[f32; 4]) -> f32 {
        (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt()
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert!(approx_eq_3(&lerp_position(&a, &b, 0.0), &a, 1e-6));
        assert!(approx_eq_3(&lerp_position(&a, &b, 1.0), &b, 1e-6));
    }

    #[test]
    fn test_lerp_midpoint() {
        let result = lerp_position(&[0.0, 0.0, 0.0], &[2.0, 4.0, 6.0], 0.5);
        assert!(approx_eq_3(&result, &[1.0, 2.0, 3.0], 1e-6));
    }

    #[test]
    fn test_nlerp_normalized() {
        let a = [0.0, 0.0, 0.0, 1.0];
        let angle = std::f32::consts::FRAC_PI_4;
        let b = [0.0, angle.sin(), 0.0, angle.cos()];

        for &t in &[0.0, 0.25, 0.5, 0.75, 1.0] {
            let len = quat_length(&nlerp(&a, &b, t));
            assert!((len - 1.0).abs() < 1e-5, "t={}: quaternion length {} is not unit", t, len);
        }
    }

    #[test]
    fn test_nlerp_shortest_path() {
        // -q と q は同じ回転: 補間結果は a のまま
        let a = [0.0, 0.0, 0.0, 1.0];
        let b = [0.0, 0.0, 0.0, -1.0];
        let result = nlerp(&a, &b, 0.5);
        assert!((result[3] - 1.0).abs() < 1e-6);
    }
}
