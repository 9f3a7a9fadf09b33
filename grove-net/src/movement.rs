//! Server-side movement integration (§4.9): a minimal authoritative mirror of client kinematics,
//! just enough to make position reconciliation meaningful.
//!
//! Colliders are limited to what the data model actually records — tree trunks and placed
//! structures. Fixed terrain features named in the distilled spec (mine ring, river/lake rings)
//! have no corresponding world-generation module anywhere in this workspace, so they are left
//! unmodeled rather than invented; see `DESIGN.md`.

use grove_protocol::inbound::InputKeys;
use grove_utils::Vector2;

/// Horizontal speed cap, in meters per second (§4.9).
pub const MAX_SPEED: f64 = 14.0;
/// Walking speed without the sprint modifier held.
pub const WALK_SPEED: f64 = MAX_SPEED * 0.5;
/// Downward acceleration applied while airborne, in meters per second squared.
pub const GRAVITY: f64 = 9.81;
/// Upward velocity imparted by a jump, in meters per second.
pub const JUMP_SPEED: f64 = 5.0;
/// Fixed eye height above the ground plane (§4.9 "single fixed eye height").
pub const EYE_HEIGHT: f64 = 1.65;
/// Player collision radius on the horizontal plane.
pub const PLAYER_RADIUS: f64 = 0.4;
/// A tree trunk's collision radius.
pub const TRUNK_RADIUS: f64 = 0.35;
/// Maximum circle-vs-circle push-out passes per integration step (§4.9).
const MAX_RESOLVE_PASSES: u32 = 4;
/// Largest `dt` accepted from a single input sample, so a stalled client can't integrate an
/// unbounded jump in one step after reconnecting.
const MAX_DT_SECS: f32 = 0.25;

/// A session's authoritative kinematic state, atomically swapped on each integration step (§5:
/// "session position — atomic pointer swap of a small struct").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World X.
    pub x: f64,
    /// World Y (eye height above the ground plane).
    pub y: f64,
    /// World Z.
    pub z: f64,
    /// Camera yaw, radians.
    pub yaw: f32,
    vy: f64,
}

impl Pose {
    /// A fresh pose at `(x, y, z)` with no yaw and no vertical velocity, as used on `join`.
    #[must_use]
    pub const fn spawn(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, yaw: 0.0, vy: 0.0 }
    }

    /// An authoritative reset, as used on `teleport` (§4.8: accepted without validation).
    #[must_use]
    pub const fn teleported(x: f64, y: f64, z: f64, yaw: f32) -> Self {
        Self { x, y, z, yaw, vy: 0.0 }
    }

    /// Whether the pose currently rests on the ground plane.
    #[must_use]
    pub fn grounded(self) -> bool {
        self.y <= EYE_HEIGHT + f64::EPSILON
    }
}

/// A fixed circular obstacle on the horizontal plane (§4.9).
#[derive(Debug, Clone, Copy)]
pub struct Collider {
    /// Center of the obstacle.
    pub center: Vector2,
    /// Collision radius.
    pub radius: f64,
}

/// One queued movement sample from an `input` frame (§6.1), stripped of the fields the movement
/// loop doesn't need (`seq`/`at` are tracked on [`crate::session::Session`] instead).
#[derive(Debug, Clone, Copy)]
pub struct InputSample {
    /// Held movement keys.
    pub keys: InputKeys,
    /// Camera yaw, radians.
    pub yaw: f32,
    /// Client-reported elapsed seconds since the previous sample.
    pub dt: f32,
}

/// Integrates `pose` forward by one `sample`: clamps horizontal speed, applies gravity and jump,
/// and resolves collisions against `colliders` (§4.9). Authoritative — this is the value the next
/// `snapshot` broadcasts, not a suggestion for the client to blend against.
#[must_use]
pub fn integrate(pose: Pose, sample: InputSample, colliders: &[Collider]) -> Pose {
    let dt = f64::from(sample.dt.clamp(0.0, MAX_DT_SECS));
    let mut next = pose;
    next.yaw = sample.yaw;

    let motion = horizontal_motion(sample.keys, sample.yaw);
    if motion.length() > f64::EPSILON {
        let speed = if sample.keys.shift { MAX_SPEED } else { WALK_SPEED };
        let step = motion.normalized().scale(speed * dt);
        next.x += step.x;
        next.z += step.z;
    }

    if sample.keys.space && pose.grounded() {
        next.vy = JUMP_SPEED;
    }
    next.vy -= GRAVITY * dt;
    next.y += next.vy * dt;
    if next.y <= EYE_HEIGHT {
        next.y = EYE_HEIGHT;
        next.vy = 0.0;
    }

    resolve_collisions(&mut next, colliders);
    next
}

/// Movement direction in world space for the held keys at `yaw`, unnormalized (zero if nothing is
/// held or opposing keys cancel).
fn horizontal_motion(keys: InputKeys, yaw: f32) -> Vector2 {
    let forward = Vector2::new(f64::from(yaw.sin()), f64::from(yaw.cos()));
    let strafe = Vector2::new(f64::from(yaw.cos()), -f64::from(yaw.sin()));
    let mut motion = Vector2::new(0.0, 0.0);
    if keys.w {
        motion = motion.add(forward);
    }
    if keys.s {
        motion = motion.sub(forward);
    }
    if keys.d {
        motion = motion.add(strafe);
    }
    if keys.a {
        motion = motion.sub(strafe);
    }
    motion
}

/// Iterative circle-vs-circle push-out on the horizontal plane, at most [`MAX_RESOLVE_PASSES`]
/// passes (§4.9).
fn resolve_collisions(pose: &mut Pose, colliders: &[Collider]) {
    for _ in 0..MAX_RESOLVE_PASSES {
        let player = Vector2::new(pose.x, pose.z);
        let mut pushed = false;
        for collider in colliders {
            let required = collider.radius + PLAYER_RADIUS;
            let delta = player.sub(collider.center);
            let dist = delta.length();
            if dist > f64::EPSILON && dist < required {
                let push = delta.normalized().scale(required - dist);
                pose.x += push.x;
                pose.z += push.z;
                pushed = true;
            }
        }
        if !pushed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_forward() -> InputKeys {
        InputKeys {
            w: true,
            ..InputKeys::default()
        }
    }

    #[test]
    fn standing_still_does_not_move_horizontally() {
        let pose = Pose::spawn(0.0, EYE_HEIGHT, 0.0);
        let sample = InputSample {
            keys: InputKeys::default(),
            yaw: 0.0,
            dt: 0.05,
        };
        let next = integrate(pose, sample, &[]);
        assert!((next.x - pose.x).abs() < 1e-9);
        assert!((next.z - pose.z).abs() < 1e-9);
    }

    #[test]
    fn sprinting_forward_moves_faster_than_walking() {
        let pose = Pose::spawn(0.0, EYE_HEIGHT, 0.0);
        let walk = integrate(
            pose,
            InputSample { keys: keys_forward(), yaw: 0.0, dt: 0.1 },
            &[],
        );
        let sprint = integrate(
            pose,
            InputSample {
                keys: InputKeys { shift: true, ..keys_forward() },
                yaw: 0.0,
                dt: 0.1,
            },
            &[],
        );
        let walk_dist = Vector2::new(walk.x, walk.z).distance(Vector2::new(0.0, 0.0));
        let sprint_dist = Vector2::new(sprint.x, sprint.z).distance(Vector2::new(0.0, 0.0));
        assert!(sprint_dist > walk_dist);
    }

    #[test]
    fn gravity_pulls_airborne_pose_back_to_eye_height() {
        let pose = Pose::teleported(0.0, 10.0, 0.0, 0.0);
        let mut current = pose;
        for _ in 0..600 {
            current = integrate(
                current,
                InputSample { keys: InputKeys::default(), yaw: 0.0, dt: 0.05 },
                &[],
            );
        }
        assert!((current.y - EYE_HEIGHT).abs() < 1e-6);
    }

    #[test]
    fn collision_pushes_player_outside_collider_radius() {
        let pose = Pose::spawn(0.1, EYE_HEIGHT, 0.0);
        let colliders = [Collider {
            center: Vector2::new(0.0, 0.0),
            radius: TRUNK_RADIUS,
        }];
        let next = integrate(
            pose,
            InputSample { keys: InputKeys::default(), yaw: 0.0, dt: 0.0 },
            &colliders,
        );
        let dist = Vector2::new(next.x, next.z).distance(Vector2::new(0.0, 0.0));
        assert!(dist >= TRUNK_RADIUS + PLAYER_RADIUS - 1e-9);
    }

    #[test]
    fn jump_only_triggers_while_grounded() {
        let airborne = Pose::teleported(0.0, 5.0, 0.0, 0.0);
        let sample = InputSample {
            keys: InputKeys { space: true, ..InputKeys::default() },
            yaw: 0.0,
            dt: 0.05,
        };
        let next = integrate(airborne, sample, &[]);
        assert!(next.y < airborne.y, "gravity still applies while airborne, jump key is ignored");
    }
}
