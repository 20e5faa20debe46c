// math.rs — 角度环绕/夹取、平滑除数、捏合距离等共用数值工具

use glam::Vec2;

/// 交互期间直接操控允许的最大纬度（避免锁死在极点）
pub const DIRECT_LATITUDE_LIMIT: f32 = 85.0;

/// 帧间隔下限：0 或极小的 dt 不能让平滑除数退化
pub const MIN_DELTA_SECONDS: f32 = 0.001;

/// 经度归一化到 [0, 360)
pub fn wrap_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid 在 f32 精度下可能返回恰好 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// 归一化坐标环绕到 [0, 1)
pub fn wrap_unit(x: f32) -> f32 {
    let wrapped = x.rem_euclid(1.0);
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// 经度 (度) 归一化后转弧度，范围 [0, 2π)
pub fn wrap_radians_from_degrees(deg: f32) -> f32 {
    wrap_degrees(deg).to_radians()
}

pub fn clamp_latitude(lat: f32, limit: f32) -> f32 {
    lat.clamp(-limit, limit)
}

/// GLSL 语义的 smoothstep
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn pinch_distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// 指数平滑的除数：`max(k * dt, 1)`。下限 1 保证一步最多到达目标，不会越过。
pub fn smoothing_divisor(smoothing: f32, delta_seconds: f32) -> f32 {
    (smoothing * delta_seconds).max(1.0)
}

/// 非有限或过小的 dt 统一抬到下限
pub fn safe_delta(delta_seconds: f32) -> f32 {
    if delta_seconds.is_finite() {
        delta_seconds.max(MIN_DELTA_SECONDS)
    } else {
        MIN_DELTA_SECONDS
    }
}

/// sign(dx)，但 0 视为 +1：自动旋转不能因为 sign(0) 停住
pub fn azimuth_sign(dx: f32) -> f32 {
    if dx < 0.0 { -1.0 } else { 1.0 }
}

/// 单步平滑：`x += (target - x) / divisor`
pub fn approach(current: f32, target: f32, divisor: f32) -> f32 {
    current + (target - current) / divisor
}
