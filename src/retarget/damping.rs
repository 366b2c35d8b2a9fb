//! Frame-rate independent exponential smoothing toward a target.
//!
//! Every driver eases joints with `1 - e^(-speed·dt)` so convergence follows
//! wall-clock time regardless of frame cadence.

use glam::Quat;

/// Blend factor for one step of `dt` seconds. Non-positive `dt` gives 0.
pub fn damp_factor(speed: f32, dt: f32) -> f32 {
    if !(dt > 0.0) || !(speed > 0.0) {
        return 0.0;
    }
    1.0 - (-speed * dt).exp()
}

pub fn damp_scalar(current: f32, target: f32, speed: f32, dt: f32) -> f32 {
    current + (target - current) * damp_factor(speed, dt)
}

/// Shortest-path slerp toward `target`.
pub fn damp_rotation(current: Quat, target: Quat, speed: f32, dt: f32) -> Quat {
    let t = damp_factor(speed, dt);
    if t <= 0.0 {
        return current;
    }
    // glam's slerp already takes the short arc
    current.slerp(target, t).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_bounds() {
        assert_eq!(damp_factor(10.0, 0.0), 0.0);
        assert_eq!(damp_factor(10.0, -1.0), 0.0);
        let f = damp_factor(10.0, 0.016);
        assert!(f > 0.0 && f < 1.0);
        assert!(damp_factor(10.0, 100.0) > 0.999);
    }

    #[test]
    fn test_frame_rate_independent() {
        // Two half steps land where one full step does
        let one = damp_scalar(0.0, 1.0, 8.0, 0.1);
        let half = damp_scalar(0.0, 1.0, 8.0, 0.05);
        let two = damp_scalar(half, 1.0, 8.0, 0.05);
        assert!((one - two).abs() < 1e-5);
    }

    #[test]
    fn test_rotation_moves_toward_target() {
        let target = Quat::from_rotation_y(1.0);
        let step = damp_rotation(Quat::IDENTITY, target, 5.0, 0.1);
        let before = Quat::IDENTITY.angle_between(target);
        let after = step.angle_between(target);
        assert!(after < before);
        assert!(step.is_normalized());
    }

    #[test]
    fn test_rotation_zero_dt_holds() {
        let current = Quat::from_rotation_x(0.3);
        assert_eq!(damp_rotation(current, Quat::IDENTITY, 5.0, 0.0), current);
    }
}
