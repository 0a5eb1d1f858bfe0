//! Landmark frame model
//!
//! The landmark detector is a black box: it hands over normalized 2D points
//! (0..1 in both axes) laid out like a 468-point face mesh, together with the
//! source image size so distances can be measured in pixels.

use crate::FeatureError;
use serde::{Deserialize, Serialize};

/// Normalized landmark position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Mesh indices used by the feature extractor
pub struct MeshIndex;

impl MeshIndex {
    pub const LEFT_EYE_TOP: usize = 159;
    pub const LEFT_EYE_BOTTOM: usize = 145;
    pub const LEFT_EYE_OUTER: usize = 33;
    pub const LEFT_EYE_INNER: usize = 133;

    pub const RIGHT_EYE_TOP: usize = 386;
    pub const RIGHT_EYE_BOTTOM: usize = 374;
    pub const RIGHT_EYE_INNER: usize = 362;
    pub const RIGHT_EYE_OUTER: usize = 263;

    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;

    pub const NOSE_TIP: usize = 1;
    pub const CHIN: usize = 152;

    /// Points in a full face mesh
    pub const MESH_SIZE: usize = 468;
}

/// One analyzed frame worth of landmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Normalized points in mesh order
    pub points: Vec<LandmarkPoint>,
    /// Source image width (pixels)
    pub image_width: u32,
    /// Source image height (pixels)
    pub image_height: u32,
}

impl LandmarkFrame {
    pub fn new(points: Vec<LandmarkPoint>, image_width: u32, image_height: u32) -> Self {
        Self {
            points,
            image_width,
            image_height,
        }
    }

    /// Fetch a landmark, failing on a truncated mesh or a non-finite coordinate
    pub fn point(&self, index: usize) -> Result<LandmarkPoint, FeatureError> {
        let point = self
            .points
            .get(index)
            .copied()
            .ok_or(FeatureError::MissingLandmark {
                index,
                available: self.points.len(),
            })?;
        if !(point.x.is_finite() && point.y.is_finite()) {
            return Err(FeatureError::NonFiniteLandmark { index });
        }
        Ok(point)
    }

    /// Euclidean distance between two landmarks in pixel space
    pub fn pixel_distance(&self, a: usize, b: usize) -> Result<f64, FeatureError> {
        let (pa, pb) = (self.point(a)?, self.point(b)?);
        let dx = (pa.x - pb.x) as f64 * self.image_width as f64;
        let dy = (pa.y - pb.y) as f64 * self.image_height as f64;
        Ok((dx * dx + dy * dy).sqrt())
    }

    /// Vertical pixel coordinate of a landmark
    pub fn pixel_y(&self, index: usize) -> Result<f64, FeatureError> {
        Ok(self.point(index)?.y as f64 * self.image_height as f64)
    }

    /// Build a mesh with prescribed eye aspect ratios, mouth opening and
    /// nose-to-chin offset (pixels, chin minus nose).
    ///
    /// Used by the synthetic frame source and by tests across the workspace.
    /// Inputs are narrowed to the `f32` precision of [`LandmarkPoint`].
    pub fn synthetic(
        left_ear: f64,
        right_ear: f64,
        mouth_open_px: f64,
        chin_offset_px: f64,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let (left_ear, right_ear) = (left_ear as f32, right_ear as f32);
        let (mouth_open_px, chin_offset_px) = (mouth_open_px as f32, chin_offset_px as f32);
        let (w, h) = (image_width as f32, image_height as f32);
        let center = LandmarkPoint::new(0.5, 0.5);
        let mut points = vec![center; MeshIndex::MESH_SIZE];
        let norm = |px: f32, py: f32| LandmarkPoint::new(px / w, py / h);

        const EYE_WIDTH_PX: f32 = 60.0;
        let eye_y = h * 0.4;

        let mut place_eye =
            |outer: usize, inner: usize, top: usize, bottom: usize, x0: f32, ear: f32| {
                let half_open = ear * EYE_WIDTH_PX / 2.0;
                let mid = x0 + EYE_WIDTH_PX / 2.0;
                points[outer] = norm(x0, eye_y);
                points[inner] = norm(x0 + EYE_WIDTH_PX, eye_y);
                points[top] = norm(mid, eye_y - half_open);
                points[bottom] = norm(mid, eye_y + half_open);
            };

        place_eye(
            MeshIndex::LEFT_EYE_OUTER,
            MeshIndex::LEFT_EYE_INNER,
            MeshIndex::LEFT_EYE_TOP,
            MeshIndex::LEFT_EYE_BOTTOM,
            w * 0.5 - 90.0,
            left_ear,
        );
        place_eye(
            MeshIndex::RIGHT_EYE_INNER,
            MeshIndex::RIGHT_EYE_OUTER,
            MeshIndex::RIGHT_EYE_TOP,
            MeshIndex::RIGHT_EYE_BOTTOM,
            w * 0.5 + 30.0,
            right_ear,
        );

        let nose_y = h * 0.55;
        let mouth_y = h * 0.65;
        points[MeshIndex::NOSE_TIP] = norm(w * 0.5, nose_y);
        points[MeshIndex::CHIN] = norm(w * 0.5, nose_y + chin_offset_px);
        points[MeshIndex::UPPER_LIP] = norm(w * 0.5, mouth_y - mouth_open_px / 2.0);
        points[MeshIndex::LOWER_LIP] = norm(w * 0.5, mouth_y + mouth_open_px / 2.0);

        Self::new(points, image_width, image_height)
    }
}
