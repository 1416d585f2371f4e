//! Blob-structure comparison of binarized regions.
//!
//! Foreground components are labelled with 8-connectivity; each side is
//! summarized by component count, total foreground area and the mean
//! bounding-box aspect ratio. Regions that correlate well pixel-wise but are
//! made of differently shaped blobs score low here.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

const AREA_WEIGHT: f32 = 0.4;
const COUNT_WEIGHT: f32 = 0.4;
const ASPECT_WEIGHT: f32 = 0.2;

/// Summary of the foreground components of one binary image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BlobStats {
    pub count: usize,
    pub total_area: usize,
    pub mean_aspect: f32,
}

#[derive(Clone, Copy)]
struct Bounds {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: usize,
}

/// Labels foreground components and summarizes them.
pub(crate) fn blob_stats(binary: &GrayImage) -> BlobStats {
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));
    let mut blobs: Vec<Option<Bounds>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0] as usize;
        if id == 0 {
            continue;
        }
        if blobs.len() < id {
            blobs.resize(id, None);
        }
        let b = blobs[id - 1].get_or_insert(Bounds {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
        });
        b.min_x = b.min_x.min(x);
        b.min_y = b.min_y.min(y);
        b.max_x = b.max_x.max(x);
        b.max_y = b.max_y.max(y);
        b.area += 1;
    }

    let present: Vec<Bounds> = blobs.into_iter().flatten().collect();
    let total_area = present.iter().map(|b| b.area).sum();
    let mean_aspect = if present.is_empty() {
        0.0
    } else {
        let sum: f32 = present
            .iter()
            .map(|b| (b.max_x - b.min_x + 1) as f32 / (b.max_y - b.min_y + 1) as f32)
            .sum();
        sum / present.len() as f32
    };
    BlobStats {
        count: present.len(),
        total_area,
        mean_aspect,
    }
}

fn ratio(a: usize, b: usize) -> f32 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    if hi == 0 {
        return 0.0;
    }
    lo as f32 / hi as f32
}

/// Shape agreement in `[0, 1]`; zero when either side has no components.
pub(crate) fn shape_similarity(a: &BlobStats, b: &BlobStats) -> f32 {
    if a.count == 0 || b.count == 0 {
        return 0.0;
    }
    let aspect = 1.0 / (1.0 + (a.mean_aspect - b.mean_aspect).abs());
    AREA_WEIGHT * ratio(a.total_area, b.total_area)
        + COUNT_WEIGHT * ratio(a.count, b.count)
        + ASPECT_WEIGHT * aspect
}
