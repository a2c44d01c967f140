use crate::scene::Aabb;
use crate::util::Mat4;

/// A 2D camera looking at the canvas.
///
/// World units are pixels with y pointing down. The projection maps the viewport
/// `[0, width] x [0, height]` to clip space; the view matrix pans and zooms on top of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    width: f32,
    height: f32,
    view: Mat4,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            view: Mat4::identity(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::ortho(0.0, self.width, self.height, 0.0, -1.0, 1.0)
    }

    /// World to clip space.
    pub fn view_projection(&self) -> Mat4 {
        self.view.then(&self.projection())
    }

    /// The orthographic matrix picking folds into every object's world transform before
    /// inverting it.
    ///
    /// This is the view matrix alone. It is used for every pick regardless of the
    /// projection, so a point handed to picking is in canvas pixels.
    pub fn ortho_matrix(&self) -> Mat4 {
        self.view
    }

    /// The part of the world the viewport shows. `None` while the view cannot be
    /// inverted.
    pub fn visible_world_bounds(&self) -> Option<Aabb> {
        let viewport = Aabb::new([0.0, 0.0], [self.width, self.height]);
        viewport.transformed(&self.view.inverse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::default::Point2D;

    #[test]
    fn viewport_corners_map_to_clip_corners() {
        let camera = Camera::new(200, 100);
        let projection = camera.projection();
        let top_left = projection.transform_point2d(Point2D::new(0.0, 0.0)).unwrap();
        let bottom_right = projection
            .transform_point2d(Point2D::new(200.0, 100.0))
            .unwrap();
        assert!((top_left - Point2D::new(-1.0, 1.0)).length() < 1e-5);
        assert!((bottom_right - Point2D::new(1.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn visible_world_follows_pan_and_zoom() {
        let mut camera = Camera::new(200, 100);
        assert_eq!(
            camera.visible_world_bounds(),
            Some(Aabb::new([0.0, 0.0], [200.0, 100.0]))
        );

        camera.set_view(Mat4::scale(2.0, 2.0, 1.0).then(&Mat4::translation(-100.0, 0.0, 0.0)));
        let visible = camera.visible_world_bounds().unwrap();
        assert!((visible.min[0] - 50.0).abs() < 1e-4);
        assert!((visible.max[0] - 150.0).abs() < 1e-4);
        assert!((visible.max[1] - 50.0).abs() < 1e-4);

        camera.set_view(Mat4::scale(0.0, 0.0, 1.0));
        assert_eq!(camera.visible_world_bounds(), None);
    }

    #[test]
    fn view_applies_before_projection() {
        let mut camera = Camera::new(200, 100);
        camera.set_view(Mat4::translation(100.0, 50.0, 0.0));
        let center = camera
            .view_projection()
            .transform_point2d(Point2D::new(0.0, 0.0))
            .unwrap();
        assert!(center.x.abs() < 1e-6 && center.y.abs() < 1e-6);
    }
}
