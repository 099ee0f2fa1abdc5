// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame annotation: skeletons, person centers, violating pairs and a status banner.

use std::fmt;
use std::str::FromStr;

use image::DynamicImage;

use crate::analyzer::FrameAnalysis;
use crate::error::{Result, SocialDistanceError};
use crate::keypoint::Pose;

#[cfg(feature = "annotate")]
use ab_glyph::{FontVec, PxScale};
#[cfg(feature = "annotate")]
use image::{Rgb, RgbImage};
#[cfg(feature = "annotate")]
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
    draw_text_mut,
};
#[cfg(feature = "annotate")]
use imageproc::rect::Rect;
#[cfg(feature = "annotate")]
use std::fs::{self, File};
#[cfg(feature = "annotate")]
use std::io;
#[cfg(feature = "annotate")]
use std::path::{Path, PathBuf};

#[cfg(feature = "annotate")]
use crate::analyzer::FrameStatus;
#[cfg(feature = "annotate")]
use crate::keypoint::Point;
#[cfg(feature = "annotate")]
use crate::visualizer::Color;
#[cfg(feature = "annotate")]
use crate::visualizer::skeleton::{LIMB_COLOR_INDICES, SKELETON, keypoint_color_index};

/// Assets URL for downloading fonts
#[cfg(feature = "annotate")]
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Font used for the status banner.
#[cfg(feature = "annotate")]
const BANNER_FONT: &str = "Arial.ttf";

/// Which layers to draw on a frame.
///
/// Parsed from a comma-separated list such as `"links,keypoints,pairs"`.
/// `"none"` or an empty string disables every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OverlayOptions {
    /// Skeleton limbs.
    pub links: bool,
    /// Keypoint dots.
    pub keypoints: bool,
    /// Person center markers.
    pub centers: bool,
    /// Lines between violating pairs.
    pub pairs: bool,
    /// SAFE/VIOLATION banner.
    pub status: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            links: true,
            keypoints: true,
            ..Self::NONE
        }
    }
}

impl OverlayOptions {
    /// No overlay at all.
    pub const NONE: Self = Self {
        links: false,
        keypoints: false,
        centers: false,
        pairs: false,
        status: false,
    };

    /// Every layer.
    pub const ALL: Self = Self {
        links: true,
        keypoints: true,
        centers: true,
        pairs: true,
        status: true,
    };

    /// Whether nothing would be drawn.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.links || self.keypoints || self.centers || self.pairs || self.status)
    }

    fn layers(&self) -> [(&'static str, bool); 5] {
        [
            ("links", self.links),
            ("keypoints", self.keypoints),
            ("centers", self.centers),
            ("pairs", self.pairs),
            ("status", self.status),
        ]
    }
}

impl FromStr for OverlayOptions {
    type Err = SocialDistanceError;

    fn from_str(s: &str) -> Result<Self> {
        let mut options = Self::NONE;
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.to_lowercase().as_str() {
                "none" => {}
                "all" => options = Self::ALL,
                "links" => options.links = true,
                "keypoints" => options.keypoints = true,
                "centers" => options.centers = true,
                "pairs" => options.pairs = true,
                "status" => options.status = true,
                other => {
                    return Err(SocialDistanceError::ConfigError(format!(
                        "Unknown overlay '{other}' (expected links, keypoints, centers, pairs, status, all or none)"
                    )));
                }
            }
        }
        Ok(options)
    }
}

impl fmt::Display for OverlayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self
            .layers()
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect();
        f.write_str(&names.join(","))
    }
}

/// Check if font exists locally or download it
#[cfg(feature = "annotate")]
pub fn check_font(font: &str) -> Option<PathBuf> {
    let font_name = Path::new(font).file_name()?.to_string_lossy();
    let config_dir = dirs::config_dir()?.join("Ultralytics");
    let font_path = config_dir.join(font_name.as_ref());

    if font_path.exists() {
        return Some(font_path);
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        crate::warn!("Failed to create config directory: {e}");
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    crate::verbose!("Downloading {url} to {}", font_path.display());

    match ureq::get(&url).call() {
        Ok(response) => {
            let mut file = match File::create(&font_path) {
                Ok(f) => f,
                Err(e) => {
                    crate::warn!("Failed to create font file: {e}");
                    return None;
                }
            };

            let mut reader = response.into_body().into_reader();
            if let Err(e) = io::copy(&mut reader, &mut file) {
                crate::warn!("Failed to download font: {e}");
                let _ = fs::remove_file(&font_path);
                return None;
            }

            Some(font_path)
        }
        Err(e) => {
            crate::warn!("Failed to download font from {url}: {e}");
            None
        }
    }
}

#[cfg(feature = "annotate")]
fn load_font(font: &str) -> Option<FontVec> {
    let path = check_font(font)?;
    let data = fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

/// Draws proximity results onto frames.
pub struct Annotator {
    options: OverlayOptions,
    #[cfg(feature = "annotate")]
    font: Option<FontVec>,
}

impl Annotator {
    /// Create an annotator. The banner font is fetched only if the status layer is on.
    #[must_use]
    pub fn new(options: OverlayOptions) -> Self {
        Self {
            options,
            #[cfg(feature = "annotate")]
            font: if options.status {
                load_font(BANNER_FONT)
            } else {
                None
            },
        }
    }

    #[must_use]
    pub const fn options(&self) -> OverlayOptions {
        self.options
    }

    /// Whether this build can draw at all.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(feature = "annotate")
    }

    /// Draw the enabled layers onto `image` in place.
    #[cfg(feature = "annotate")]
    pub fn annotate(&self, image: &mut DynamicImage, poses: &[Pose], analysis: &FrameAnalysis) {
        if self.options.is_empty() {
            return;
        }

        let mut img = image.to_rgb8();
        let scale = line_scale(&img);

        if self.options.links {
            for pose in poses {
                draw_skeleton(&mut img, pose, scale);
            }
        }
        if self.options.keypoints {
            for pose in poses {
                draw_keypoints(&mut img, pose, scale);
            }
        }
        if self.options.pairs {
            for pair in analysis.violations() {
                let (Some(a), Some(b)) = (analysis.persons.get(pair.i), analysis.persons.get(pair.j))
                else {
                    continue;
                };
                draw_thick_line(&mut img, a.center, b.center, Color::for_pair(pair).into(), scale);
            }
        }
        if self.options.centers {
            let radius = 3 * scale;
            for person in &analysis.persons {
                let c = to_pixel(person.center);
                draw_filled_circle_mut(&mut img, c, radius, Rgb::from(Color::YELLOW));
                draw_hollow_circle_mut(&mut img, c, radius, Rgb::from(Color::BLACK));
            }
        }
        if self.options.status {
            self.draw_banner(&mut img, analysis);
        }

        *image = DynamicImage::ImageRgb8(img);
    }

    /// Without the `annotate` feature frames pass through untouched.
    #[cfg(not(feature = "annotate"))]
    pub fn annotate(&self, _image: &mut DynamicImage, _poses: &[Pose], _analysis: &FrameAnalysis) {}

    #[cfg(feature = "annotate")]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn draw_banner(&self, img: &mut RgbImage, analysis: &FrameAnalysis) {
        let status = analysis.status();
        let (width, height) = img.dimensions();
        let bar_height = ((height as f32 * 0.06).round() as u32).clamp(16, 48).min(height);
        if width == 0 || bar_height == 0 {
            return;
        }

        let rect = Rect::at(0, 0).of_size(width, bar_height);
        draw_filled_rect_mut(img, rect, Color::for_status(status).into());

        if let Some(ref font) = self.font {
            let label = banner_label(status, analysis);
            let text_color = match status {
                FrameStatus::Safe => Color::BLACK,
                FrameStatus::Violation => Color::WHITE,
            };
            let px = bar_height as f32 * 0.75;
            let y = ((bar_height as f32 - px) / 2.0) as i32;
            draw_text_mut(img, text_color.into(), 8, y, PxScale::from(px), font, &label);
        }
    }
}

/// Text shown in the status banner.
#[must_use]
pub fn banner_label(status: impl fmt::Display, analysis: &FrameAnalysis) -> String {
    let n_violations = analysis.violations().count();
    if n_violations == 0 {
        format!("{status} | people={}", analysis.num_people())
    } else {
        format!(
            "{status} | people={}, too close={n_violations}",
            analysis.num_people()
        )
    }
}

/// Stroke width multiplier, so thin lines stay visible on large frames.
#[cfg(feature = "annotate")]
fn line_scale(img: &RgbImage) -> i32 {
    let longest = img.width().max(img.height());
    i32::try_from(longest / 640).unwrap_or(1).max(1)
}

#[cfg(feature = "annotate")]
#[allow(clippy::cast_possible_truncation)]
fn to_pixel(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

#[cfg(feature = "annotate")]
#[allow(clippy::cast_precision_loss)]
fn draw_thick_line(img: &mut RgbImage, a: Point, b: Point, color: Rgb<u8>, thickness: i32) {
    let half = thickness / 2;
    for dx in -half..=half {
        for dy in -half..=half {
            let (ox, oy) = (dx as f32, dy as f32);
            draw_line_segment_mut(img, (a.x + ox, a.y + oy), (b.x + ox, b.y + oy), color);
        }
    }
}

#[cfg(feature = "annotate")]
fn draw_skeleton(img: &mut RgbImage, pose: &Pose, scale: i32) {
    for (limb, (from, to)) in SKELETON.iter().enumerate() {
        let (Some(a), Some(b)) = (pose.find(*from), pose.find(*to)) else {
            continue;
        };
        let color = Color::from_pose_index(LIMB_COLOR_INDICES[limb]);
        draw_thick_line(img, a.position(), b.position(), color.into(), scale);
    }
}

#[cfg(feature = "annotate")]
fn draw_keypoints(img: &mut RgbImage, pose: &Pose, scale: i32) {
    let radius = 2 * scale;
    for kp in pose {
        let color = Color::from_pose_index(keypoint_color_index(kp.id));
        draw_filled_circle_mut(img, to_pixel(kp.position()), radius, color.into());
    }
}
