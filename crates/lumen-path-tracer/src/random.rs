use glam::{Vec2, Vec3};

/// Fast high quality random number generator. `state` must never be zero.
pub fn xor_shift_u32(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

/// Random f32 in `[0, 1)` based on `xor_shift_u32`.
pub fn random_f32(state: &mut u32) -> f32 {
    // Top 24 bits keep the result strictly below one.
    (xor_shift_u32(state) >> 8) as f32 * (1.0 / 16_777_216.0)
}

pub fn random_vec2(state: &mut u32) -> Vec2 {
    let x = random_f32(state);
    let y = random_f32(state);
    Vec2::new(x, y)
}

/// Concentric mapping of `u` in `[0, 1)^2` onto the unit disk.
pub fn sample_disk(u: Vec2) -> Vec2 {
    let offset = u * 2.0 - 1.0;
    if offset == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (
            offset.x,
            std::f32::consts::FRAC_PI_4 * (offset.y / offset.x),
        )
    } else {
        (
            offset.y,
            std::f32::consts::FRAC_PI_2 - std::f32::consts::FRAC_PI_4 * (offset.x / offset.y),
        )
    };

    r * Vec2::new(theta.cos(), theta.sin())
}

/// Cosine weighted direction in the local frame where `+Z` is the normal.
pub fn sample_cosine_hemisphere(u: Vec2) -> Vec3 {
    let d = sample_disk(u);
    let z = (1.0 - d.length_squared()).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}
