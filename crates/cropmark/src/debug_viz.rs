//! Stage overlay renderer.
//!
//! Draws the baseline, per-phase, and final windows over a page render so
//! a bad crop can be diagnosed at a glance. The color key goes into a
//! sidecar text file next to the overlay. Purely optional output; failures
//! here never affect the run's artifacts.

use crate::error::Result;
use crate::geometry::Rect;
use crate::pdf::PageRaster;
use image::{Rgb, RgbImage};
use std::io::Write;
use std::path::Path;

pub const DEBUG_DIR: &str = "debug";

/// Overlay render resolution.
const OVERLAY_DPI: f32 = 72.0;

const BORDER_THICKNESS: u32 = 2;

const BASELINE_COLOR: Rgb<u8> = Rgb([66, 133, 244]);
const AFTER_A_COLOR: Rgb<u8> = Rgb([52, 168, 83]);
const AFTER_B_COLOR: Rgb<u8> = Rgb([251, 140, 0]);
const AFTER_D_COLOR: Rgb<u8> = Rgb([171, 71, 188]);
const FINAL_COLOR: Rgb<u8> = Rgb([217, 48, 37]);

/// The windows worth seeing for one attachment.
#[derive(Debug, Clone, Copy)]
pub struct StageRects {
    pub baseline: Rect,
    pub after_a: Option<Rect>,
    pub after_b: Option<Rect>,
    pub after_d: Option<Rect>,
    pub final_rect: Rect,
}

/// Render the overlay and legend under `<out_dir>/debug/`; returns the
/// relative paths of the written artifacts.
pub fn write_overlay(
    out_dir: &Path,
    base_name: &str,
    raster: &dyn PageRaster,
    page: u32,
    stages: &StageRects,
) -> Result<Vec<String>> {
    let debug_dir = out_dir.join(DEBUG_DIR);
    std::fs::create_dir_all(&debug_dir)?;

    let mut image = raster
        .render(page, OVERLAY_DPI, None)
        .map_err(crate::error::CropmarkError::from)?;
    let scale = OVERLAY_DPI / 72.0;

    draw_border(&mut image, &stages.baseline, scale, BASELINE_COLOR);
    if let Some(r) = stages.after_a {
        draw_border(&mut image, &r, scale, AFTER_A_COLOR);
    }
    if let Some(r) = stages.after_b {
        draw_border(&mut image, &r, scale, AFTER_B_COLOR);
    }
    if let Some(r) = stages.after_d {
        draw_border(&mut image, &r, scale, AFTER_D_COLOR);
    }
    draw_border(&mut image, &stages.final_rect, scale, FINAL_COLOR);

    let overlay_name = format!("{}_stages.png", base_name);
    let legend_name = format!("{}_legend.txt", base_name);
    crate::output::write_png(&debug_dir, &overlay_name, &image)?;

    let mut legend = std::fs::File::create(debug_dir.join(&legend_name))?;
    writeln!(legend, "blue    baseline  {:?}", stages.baseline)?;
    if let Some(r) = stages.after_a {
        writeln!(legend, "green   after A   {:?}", r)?;
    }
    if let Some(r) = stages.after_b {
        writeln!(legend, "orange  after B   {:?}", r)?;
    }
    if let Some(r) = stages.after_d {
        writeln!(legend, "purple  after D   {:?}", r)?;
    }
    writeln!(legend, "red     final     {:?}", stages.final_rect)?;

    Ok(vec![
        format!("{}/{}", DEBUG_DIR, overlay_name),
        format!("{}/{}", DEBUG_DIR, legend_name),
    ])
}

/// Paint a rectangle border, clamped to the image.
fn draw_border(image: &mut RgbImage, rect: &Rect, scale: f32, color: Rgb<u8>) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let x0 = ((rect.x0 * scale) as u32).min(w - 1);
    let y0 = ((rect.y0 * scale) as u32).min(h - 1);
    let x1 = ((rect.x1 * scale) as u32).min(w - 1);
    let y1 = ((rect.y1 * scale) as u32).min(h - 1);

    for t in 0..BORDER_THICKNESS {
        for x in x0..=x1 {
            image.put_pixel(x, (y0 + t).min(h - 1), color);
            image.put_pixel(x, y1.saturating_sub(t), color);
        }
        for y in y0..=y1 {
            image.put_pixel((x0 + t).min(w - 1), y, color);
            image.put_pixel(x1.saturating_sub(t), y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::testutil::SyntheticRaster;

    #[test]
    fn test_overlay_written_with_legend() {
        let dir = tempfile::tempdir().unwrap();
        let raster = SyntheticRaster {
            page_w: 612.0,
            page_h: 792.0,
            dark: vec![Rect::new(72.0, 100.0, 540.0, 440.0)],
        };
        let stages = StageRects {
            baseline: Rect::new(20.0, 100.0, 592.0, 450.0),
            after_a: Some(Rect::new(20.0, 110.0, 592.0, 445.0)),
            after_b: None,
            after_d: Some(Rect::new(64.0, 92.0, 548.0, 447.0)),
            final_rect: Rect::new(64.0, 92.0, 548.0, 447.0),
        };
        let artifacts = write_overlay(dir.path(), "Figure_1_Overview", &raster, 1, &stages).unwrap();
        assert_eq!(artifacts.len(), 2);
        for artifact in &artifacts {
            assert!(dir.path().join(artifact).exists(), "missing {}", artifact);
        }
        let legend = std::fs::read_to_string(dir.path().join(&artifacts[1])).unwrap();
        assert!(legend.contains("baseline"));
        assert!(legend.contains("final"));
        assert!(!legend.contains("after B"));
    }

    #[test]
    fn test_border_clamped_to_image() {
        let mut img = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        // Rect far larger than the image must not panic.
        draw_border(&mut img, &Rect::new(-10.0, -10.0, 500.0, 500.0), 1.0, FINAL_COLOR);
        assert_eq!(*img.get_pixel(49, 49), FINAL_COLOR);
    }
}
