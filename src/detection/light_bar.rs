//! Light-bar extraction: binarize a frame, clean the mask, and fit oriented
//! rectangles to elongated bright regions.

use anyhow::Result;
use nalgebra::Point2;
use opencv::core::{Mat, Point, RotatedRect, Size, Vector};
use opencv::imgproc;
use opencv::prelude::*;

use crate::config::{Binarization, ExtractorConfig};

/// Oriented rectangle hypothesized to be one illuminated stripe of a plate.
///
/// `angle` follows the OpenCV `RotatedRect` convention (degrees, rotation of
/// the `width` edge from the image x axis).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightBar {
    pub center: Point2<f32>,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl LightBar {
    pub fn new(center: Point2<f32>, width: f32, height: f32, angle: f32) -> Self {
        Self {
            center,
            width,
            height,
            angle,
        }
    }

    /// Long side over short side, `None` when the short side is zero.
    pub fn aspect_ratio(&self) -> Option<f32> {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height);
        if short <= 0.0 {
            return None;
        }
        Some(long / short)
    }

    /// The four vertices, in the same order as `cv::RotatedRect::points`.
    pub fn vertices(&self) -> [Point2<f32>; 4] {
        let theta = self.angle.to_radians();
        let b = theta.cos() * 0.5;
        let a = theta.sin() * 0.5;
        let (c, w, h) = (self.center, self.width, self.height);

        let p0 = Point2::new(c.x - a * h - b * w, c.y + b * h - a * w);
        let p1 = Point2::new(c.x + a * h - b * w, c.y - b * h - a * w);
        let p2 = Point2::new(2.0 * c.x - p0.x, 2.0 * c.y - p0.y);
        let p3 = Point2::new(2.0 * c.x - p1.x, 2.0 * c.y - p1.y);
        [p0, p1, p2, p3]
    }
}

impl From<RotatedRect> for LightBar {
    fn from(rect: RotatedRect) -> Self {
        Self::new(
            Point2::new(rect.center.x, rect.center.y),
            rect.size.width,
            rect.size.height,
            rect.angle,
        )
    }
}

/// Turns a color frame into a set of candidate light bars.
pub struct LightBarExtractor {
    config: ExtractorConfig,
    kernel: Mat,
}

impl LightBarExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        let kernel = imgproc::get_structuring_element_def(
            imgproc::MORPH_RECT,
            Size::new(config.kernel_size, config.kernel_size),
        )?;
        Ok(Self { config, kernel })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract light bars from a BGR (or already single-channel) frame.
    /// An empty frame yields no bars.
    pub fn extract(&self, frame: &Mat) -> Result<Vec<LightBar>> {
        if frame.empty() {
            return Ok(Vec::new());
        }
        let binary = self.binarize(frame)?;
        self.find_light_bars(&binary)
    }

    /// Intensity conversion, thresholding, then closing followed by opening.
    pub fn binarize(&self, frame: &Mat) -> Result<Mat> {
        let gray = match frame.channels() {
            1 => frame.try_clone()?,
            4 => {
                let mut gray = Mat::default();
                imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGRA2GRAY)?;
                gray
            }
            _ => {
                let mut gray = Mat::default();
                imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGR2GRAY)?;
                gray
            }
        };

        let mut binary = Mat::default();
        match self.config.binarization {
            Binarization::Adaptive { block_size, c } => {
                imgproc::adaptive_threshold(
                    &gray,
                    &mut binary,
                    255.0,
                    imgproc::ADAPTIVE_THRESH_GAUSSIAN_C,
                    imgproc::THRESH_BINARY,
                    block_size,
                    c,
                )?;
            }
            Binarization::Fixed { threshold } => {
                imgproc::threshold(&gray, &mut binary, threshold, 255.0, imgproc::THRESH_BINARY)?;
            }
        }

        let mut closed = Mat::default();
        imgproc::morphology_ex_def(&binary, &mut closed, imgproc::MORPH_CLOSE, &self.kernel)?;
        let mut opened = Mat::default();
        imgproc::morphology_ex_def(&closed, &mut opened, imgproc::MORPH_OPEN, &self.kernel)?;
        Ok(opened)
    }

    /// Fit bars to the external contours of a cleaned binary mask.
    pub fn find_light_bars(&self, binary: &Mat) -> Result<Vec<LightBar>> {
        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours_def(
            binary,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
        )?;

        let mut bars = Vec::new();
        for contour in contours.iter() {
            if imgproc::contour_area_def(&contour)? < self.config.min_contour_area {
                continue;
            }
            let bar = LightBar::from(imgproc::min_area_rect(&contour)?);
            match bar.aspect_ratio() {
                Some(ratio) if ratio > self.config.min_aspect_ratio => bars.push(bar),
                _ => {}
            }
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{CV_8UC3, Rect, Scalar};

    fn blank_frame() -> Mat {
        Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    fn fill(frame: &mut Mat, rect: Rect) {
        imgproc::rectangle(frame, rect, Scalar::all(255.0), imgproc::FILLED, imgproc::LINE_8, 0)
            .unwrap();
    }

    fn fixed_extractor() -> LightBarExtractor {
        LightBarExtractor::new(ExtractorConfig {
            binarization: Binarization::Fixed { threshold: 100.0 },
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_vertices_axis_aligned() {
        let bar = LightBar::new(Point2::new(100.0, 100.0), 20.0, 100.0, 0.0);
        let v = bar.vertices();
        // OpenCV order: bottom-left, top-left, top-right, bottom-right for angle 0.
        let expected = [(90.0, 150.0), (90.0, 50.0), (110.0, 50.0), (110.0, 150.0)];
        for (p, (x, y)) in v.iter().zip(expected) {
            assert!((p.x - x).abs() < 1e-4, "{:?}", v);
            assert!((p.y - y).abs() < 1e-4, "{:?}", v);
        }
    }

    #[test]
    fn test_vertices_preserve_center() {
        let bar = LightBar::new(Point2::new(50.0, 70.0), 8.0, 40.0, 33.0);
        let v = bar.vertices();
        let cx = v.iter().map(|p| p.x).sum::<f32>() / 4.0;
        let cy = v.iter().map(|p| p.y).sum::<f32>() / 4.0;
        assert!((cx - 50.0).abs() < 1e-4);
        assert!((cy - 70.0).abs() < 1e-4);
    }

    #[test]
    fn test_aspect_ratio() {
        let bar = LightBar::new(Point2::new(0.0, 0.0), 80.0, 20.0, 90.0);
        assert_eq!(bar.aspect_ratio(), Some(4.0));
        let flat = LightBar::new(Point2::new(0.0, 0.0), 0.0, 20.0, 0.0);
        assert_eq!(flat.aspect_ratio(), None);
    }

    #[test]
    fn test_extract_two_bars() {
        let mut frame = blank_frame();
        fill(&mut frame, Rect::new(280, 200, 20, 80));
        fill(&mut frame, Rect::new(340, 200, 20, 80));

        let mut bars = fixed_extractor().extract(&frame).unwrap();
        assert_eq!(bars.len(), 2);
        bars.sort_by(|a, b| a.center.x.total_cmp(&b.center.x));
        assert!((bars[0].center.x - 289.5).abs() < 1.0);
        assert!((bars[1].center.x - 349.5).abs() < 1.0);
        for bar in &bars {
            assert!(bar.aspect_ratio().unwrap() > 2.0);
            assert!((bar.center.y - 239.5).abs() < 1.0);
        }
    }

    #[test]
    fn test_extract_rejects_blobs_and_specks() {
        let mut frame = blank_frame();
        fill(&mut frame, Rect::new(100, 100, 60, 60));
        fill(&mut frame, Rect::new(400, 300, 4, 12));

        let bars = fixed_extractor().extract(&frame).unwrap();
        assert!(bars.is_empty(), "{:?}", bars);
    }

    #[test]
    fn test_extract_blank_frame_default_config() {
        let extractor = LightBarExtractor::new(ExtractorConfig::default()).unwrap();
        assert!(extractor.extract(&blank_frame()).unwrap().is_empty());
        assert!(extractor.extract(&Mat::default()).unwrap().is_empty());
    }

    #[test]
    fn test_binarize_single_channel() {
        let gray = Mat::new_rows_cols_with_default(40, 40, opencv::core::CV_8UC1, Scalar::all(200.0))
            .unwrap();
        let binary = fixed_extractor().binarize(&gray).unwrap();
        assert_eq!(binary.channels(), 1);
        assert_eq!(*binary.at_2d::<u8>(20, 20).unwrap(), 255);
    }

    #[test]
    fn test_new_rejects_bad_kernel() {
        let config = ExtractorConfig {
            kernel_size: 2,
            ..Default::default()
        };
        assert!(LightBarExtractor::new(config).is_err());
    }
}
