//! Closed-form inverse kinematics for the planar 2-link arm.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::{ArmGeometry, Point};

/// Joint angles in degrees.
///
/// `theta1` is the shoulder angle, wrapped into `(-180, 180]`. `theta2` is the
/// interior elbow angle in `[0, 180]`: `0` is fully folded, `180` fully
/// extended.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    pub theta1: f64,
    pub theta2: f64,
}

impl JointAngles {
    /// Substituted when the solver produces a non-finite value.
    pub const FALLBACK: Self = Self {
        theta1: 0.0,
        theta2: 180.0,
    };

    fn from_radians(theta1: f64, theta2: f64) -> Self {
        let angles = Self {
            theta1: wrap_degrees(theta1.to_degrees()),
            theta2: theta2.to_degrees().clamp(0.0, 180.0),
        };
        if angles.theta1.is_finite() && angles.theta2.is_finite() {
            angles
        } else {
            Self::FALLBACK
        }
    }

    /// Round both angles to `decimals` places.
    pub fn rounded(self, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals.min(12) as i32);
        let round = |v: f64| (v * scale).round() / scale + 0.0;
        Self {
            theta1: round(self.theta1),
            theta2: round(self.theta2),
        }
    }
}

/// One instruction for the arm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JointCommand {
    /// Move to the given angles with the pen down.
    Move(JointAngles),
    /// Lift the pen, ending a stroke batch.
    PenUp,
}

fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Maps operator-space points onto joint angles.
///
/// Every point is first clamped into the workspace annulus, so the
/// law-of-cosines step always sees a reachable target.
#[derive(Clone, Copy, Debug, Default)]
pub struct Translator {
    geometry: ArmGeometry,
}

impl Translator {
    pub fn new(geometry: ArmGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &ArmGeometry {
        &self.geometry
    }

    pub fn clamp(&self, point: Point) -> Point {
        self.geometry.bounds().clamp(point)
    }

    /// Clamp then solve.
    pub fn translate(&self, point: Point) -> JointAngles {
        self.solve(self.clamp(point))
    }

    /// Solve for a point assumed to lie in the workspace.
    pub fn solve(&self, point: Point) -> JointAngles {
        let (l1, l2) = self.geometry.lengths();
        let (o1, o2) = self.geometry.offsets();

        let r = point.radius();
        let alpha = point.heading() - o1 - o2;

        // Clamped against float overshoot at the annulus edges.
        let cos_bend = ((r * r - l1 * l1 - l2 * l2) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
        let bend = cos_bend.acos();

        let theta1 = alpha - (l2 * bend.sin()).atan2(l1 + l2 * cos_bend);
        let theta2 = PI - bend;
        JointAngles::from_radians(theta1, theta2)
    }

    /// Tip position reached by `angles`.
    pub fn forward(&self, angles: JointAngles) -> Point {
        let (l1, l2) = self.geometry.lengths();
        let (o1, o2) = self.geometry.offsets();
        let shoulder = angles.theta1.to_radians() + o1 + o2;
        let elbow = shoulder + PI - angles.theta2.to_radians();
        Point::new(
            l1 * shoulder.cos() + l2 * elbow.cos(),
            l1 * shoulder.sin() + l2 * elbow.sin(),
        )
    }
}
