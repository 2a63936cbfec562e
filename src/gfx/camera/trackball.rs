//! Virtual trackball
//!
//! Maps 2D pointer drags onto rotations of a virtual unit sphere sitting in
//! the middle of the viewport. Pointer positions inside the sphere's
//! silhouette land on its front hemisphere, positions outside land on the
//! z = 0 rim, so a drag that leaves the window still produces a well defined
//! point.
//!
//! The orientation is kept as two quaternions: the committed orientation of
//! the last finished drag and the pending orientation of the drag in
//! progress. The pending one only becomes committed when the drag ends.

use cgmath::{
    Deg, InnerSpace, Matrix, Matrix4, Quaternion, Rad, Rotation3, Vector2, Vector3,
};

/// Viewport assumed until [`VirtualTrackball::set_viewport_size`] is called
pub const DEFAULT_VIEWPORT: (u32, u32) = (800, 600);

/// Axes shorter than this are treated as "no rotation"
const MIN_AXIS_LENGTH: f32 = 1e-6;

/// Arcball-style camera orientation driven by pointer drags
#[derive(Debug, Clone)]
pub struct VirtualTrackball {
    committed: Quaternion<f32>,
    pending: Quaternion<f32>,
    drag_origin: Vector3<f32>,
    dragging: bool,
    width: u32,
    height: u32,
}

impl Default for VirtualTrackball {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTrackball {
    /// Creates an idle trackball with the identity orientation
    pub fn new() -> Self {
        let identity = Quaternion::new(1.0, 0.0, 0.0, 0.0);
        Self {
            committed: identity,
            pending: identity,
            drag_origin: Vector3::unit_z(),
            dragging: false,
            width: DEFAULT_VIEWPORT.0,
            height: DEFAULT_VIEWPORT.1,
        }
    }

    /// Configures the pixel-to-normalised coordinate mapping
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Starts a drag with the sphere point under the pointer as reference
    pub fn begin_drag(&mut self, x: i32, y: i32) {
        self.drag_origin = self.point_on_sphere(x, y);
        self.pending = self.committed;
        self.dragging = true;
    }

    /// Updates the pending orientation for the current pointer position
    ///
    /// Rotation is slowed down by `zoom_factor` when zoomed in (factors below
    /// one have no effect). Does nothing unless a drag is in progress.
    pub fn update_drag(&mut self, x: i32, y: i32, zoom_factor: f32) {
        if !self.dragging {
            return;
        }

        let current = self.point_on_sphere(x, y);
        let cos_theta = self.drag_origin.dot(current).clamp(-1.0, 1.0);
        let theta = Deg::from(Rad(cos_theta.acos())) / zoom_factor.max(1.0);

        let axis = current.cross(self.drag_origin);
        self.pending = if axis.magnitude() < MIN_AXIS_LENGTH {
            self.committed
        } else {
            self.committed * Quaternion::from_axis_angle(axis.normalize(), theta)
        };
    }

    /// Ends the drag and commits the pending orientation
    ///
    /// Calling this while idle leaves the orientation untouched.
    pub fn end_drag(&mut self, _x: i32, _y: i32) {
        if !self.dragging {
            return;
        }
        self.dragging = false;
        self.committed = self.pending.normalize();
        self.pending = self.committed;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Orientation of the last completed drag
    pub fn committed_orientation(&self) -> Quaternion<f32> {
        self.committed
    }

    /// Orientation of the drag in progress
    pub fn pending_orientation(&self) -> Quaternion<f32> {
        self.pending
    }

    /// View rotation for the current orientation
    ///
    /// This is the inverse (transpose) of the orientation's rotation, since
    /// it rotates the camera rather than the object.
    pub fn current_transform(&self) -> Matrix4<f32> {
        let orientation = if self.dragging {
            self.pending
        } else {
            self.committed
        };
        Matrix4::from(orientation).transpose()
    }

    /// Pixel coordinates to a centred, y-up square of side one
    fn normalized_coordinates(&self, x: i32, y: i32) -> Vector2<f32> {
        Vector2::new(
            x as f32 / self.width as f32 - 0.5,
            0.5 - y as f32 / self.height as f32,
        )
    }

    /// Projects a pointer position onto the virtual sphere or its rim
    pub fn point_on_sphere(&self, x: i32, y: i32) -> Vector3<f32> {
        project_to_sphere(self.normalized_coordinates(x, y))
    }
}

/// Sphere/rim projection for normalised coordinates
pub fn project_to_sphere(p: Vector2<f32>) -> Vector3<f32> {
    let r = p.magnitude();
    if r < 0.5 {
        let z = (1.0 - 4.0 * r * r).max(0.0).sqrt();
        Vector3::new(2.0 * p.x, 2.0 * p.y, z).normalize()
    } else {
        Vector3::new(p.x / r, p.y / r, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{SquareMatrix, Vector4};
    use rand::Rng;

    const EPS: f32 = 1e-4;

    fn assert_matrix_near(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        for c in 0..4 {
            for r in 0..4 {
                assert!(
                    (a[c][r] - b[c][r]).abs() < EPS,
                    "column {c} row {r}: {} vs {}",
                    a[c][r],
                    b[c][r]
                );
            }
        }
    }

    fn has_nan(m: Matrix4<f32>) -> bool {
        let m: [[f32; 4]; 4] = m.into();
        m.iter().flatten().any(|v| v.is_nan())
    }

    #[test]
    fn test_inside_points_are_on_front_hemisphere() {
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let r = rng.random_range(0.0..0.4999);
            let p = project_to_sphere(Vector2::new(r * angle.cos(), r * angle.sin()));
            assert!((p.magnitude() - 1.0).abs() < EPS);
            assert!(p.z >= 0.0);
        }
    }

    #[test]
    fn test_outside_points_are_on_rim() {
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let r = rng.random_range(0.5..50.0);
            let p = project_to_sphere(Vector2::new(r * angle.cos(), r * angle.sin()));
            assert_eq!(p.z, 0.0);
            assert!((p.magnitude() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_projection_is_continuous_at_silhouette() {
        for step in 0..16 {
            let angle = step as f32 * std::f32::consts::TAU / 16.0;
            let dir = Vector2::new(angle.cos(), angle.sin());
            let inside = project_to_sphere(dir * (0.5 - 1e-6));
            let outside = project_to_sphere(dir * 0.5);
            assert!((inside - outside).magnitude() < 1e-2);
        }
    }

    #[test]
    fn test_pixel_mapping_flips_y() {
        let ball = VirtualTrackball::new();
        // Window centre hits the sphere's pole
        let centre = ball.point_on_sphere(400, 300);
        assert!((centre - Vector3::unit_z()).magnitude() < EPS);
        // Top edge of the window is +y on the rim
        let top = ball.point_on_sphere(400, 0);
        assert!((top - Vector3::unit_y()).magnitude() < EPS);
        // Far outside the window still yields a unit point
        let far = ball.point_on_sphere(-5000, 9000);
        assert!((far.magnitude() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_starts_idle_with_identity() {
        let ball = VirtualTrackball::new();
        assert!(!ball.is_dragging());
        assert_matrix_near(ball.current_transform(), Matrix4::identity());
    }

    #[test]
    fn test_update_while_idle_is_noop() {
        let mut ball = VirtualTrackball::new();
        let committed = ball.committed_orientation();
        let pending = ball.pending_orientation();
        ball.update_drag(10, 20, 1.0);
        assert_eq!(ball.committed_orientation(), committed);
        assert_eq!(ball.pending_orientation(), pending);
        assert!(!ball.is_dragging());
    }

    #[test]
    fn test_degenerate_drag_is_identity() {
        let mut ball = VirtualTrackball::new();
        ball.begin_drag(123, 321);
        ball.update_drag(123, 321, 1.0);
        let transform = ball.current_transform();
        assert!(!has_nan(transform));
        assert_matrix_near(transform, Matrix4::identity());
        ball.end_drag(123, 321);
        assert!(!has_nan(ball.current_transform()));
    }

    #[test]
    fn test_end_drag_twice_is_idempotent() {
        let mut ball = VirtualTrackball::new();
        ball.begin_drag(400, 300);
        ball.update_drag(500, 260, 1.0);
        ball.end_drag(500, 260);
        let first = ball.committed_orientation();
        ball.end_drag(500, 260);
        assert_eq!(ball.committed_orientation(), first);
    }

    #[test]
    fn test_horizontal_drag_rotates_about_y() {
        let mut ball = VirtualTrackball::new();
        ball.begin_drag(400, 300);
        ball.update_drag(480, 300, 1.0);
        ball.end_drag(480, 300);

        let transform = ball.current_transform();
        let y = transform * Vector4::unit_y();
        assert!((y - Vector4::unit_y()).magnitude() < EPS);
        assert!((transform.determinant() - 1.0).abs() < EPS);

        // Committed orientation stays unit length
        assert!((ball.committed_orientation().magnitude() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_rotation_angle_matches_sphere_points() {
        let mut ball = VirtualTrackball::new();
        let start = ball.point_on_sphere(400, 300);
        let end = ball.point_on_sphere(400, 220);
        let expected = start.dot(end).acos();

        ball.begin_drag(400, 300);
        ball.update_drag(400, 220, 1.0);
        let angle = 2.0 * ball.pending_orientation().s.clamp(-1.0, 1.0).acos();
        assert!((angle - expected).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_slows_rotation() {
        let mut normal = VirtualTrackball::new();
        normal.begin_drag(400, 300);
        normal.update_drag(520, 300, 1.0);
        let full = 2.0 * normal.pending_orientation().s.acos();

        let mut zoomed = VirtualTrackball::new();
        zoomed.begin_drag(400, 300);
        zoomed.update_drag(520, 300, 2.0);
        let half = 2.0 * zoomed.pending_orientation().s.acos();
        assert!((half * 2.0 - full).abs() < 1e-3);

        // Zooming out never speeds rotation up
        let mut wide = VirtualTrackball::new();
        wide.begin_drag(400, 300);
        wide.update_drag(520, 300, 0.5);
        assert_eq!(wide.pending_orientation(), normal.pending_orientation());
    }

    #[test]
    fn test_transform_is_inverse_of_orientation() {
        let mut ball = VirtualTrackball::new();
        ball.begin_drag(300, 200);
        ball.update_drag(450, 380, 1.0);
        let during = ball.current_transform();
        let rotation = Matrix4::from(ball.pending_orientation());
        assert_matrix_near(during * rotation, Matrix4::identity());
    }

    #[test]
    fn test_drags_accumulate() {
        let mut ball = VirtualTrackball::new();
        ball.begin_drag(400, 300);
        ball.update_drag(460, 300, 1.0);
        ball.end_drag(460, 300);
        let after_first = ball.committed_orientation();

        ball.begin_drag(400, 300);
        // Before any movement the view is still the committed one
        assert_eq!(ball.pending_orientation(), after_first);
        ball.update_drag(460, 300, 1.0);
        ball.end_drag(460, 300);

        let single = 2.0 * after_first.s.acos();
        let double = 2.0 * ball.committed_orientation().s.acos();
        assert!((double - 2.0 * single).abs() < 1e-3);
    }

    #[test]
    fn test_viewport_size_changes_mapping() {
        let mut ball = VirtualTrackball::new();
        ball.set_viewport_size(200, 100);
        assert_eq!(ball.viewport_size(), (200, 100));
        let centre = ball.point_on_sphere(100, 50);
        assert!((centre - Vector3::unit_z()).magnitude() < EPS);
    }
}
