// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connected-component filtering of the binarized ink layer.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl ComponentStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn aspect_ratio(&self) -> f32 {
        let w = (self.max_x - self.min_x + 1) as f32;
        let h = (self.max_y - self.min_y + 1) as f32;
        w / h
    }
}

/// Erase 4-connected ink components that are smaller than `min_area` or whose
/// bounding box is more elongated than `max_aspect` (either orientation).
///
/// Ink is black (0) on white (255). Returns the number of erased components.
pub fn filter_components(binary: &mut GrayImage, min_area: u32, max_aspect: f32) -> usize {
    let labels = connected_components(&*binary, Connectivity::Four, Luma([255u8]));

    let mut stats: Vec<Option<ComponentStats>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0] as usize;
        if id == 0 {
            continue;
        }
        if stats.len() <= id {
            stats.resize(id + 1, None);
        }
        stats[id]
            .get_or_insert_with(|| ComponentStats::new(x, y))
            .include(x, y);
    }

    let max_aspect = max_aspect.max(1.0);
    let min_aspect = 1.0 / max_aspect;
    let erase: Vec<bool> = stats
        .iter()
        .map(|s| match s {
            Some(s) => {
                let aspect = s.aspect_ratio();
                s.area < min_area || aspect > max_aspect || aspect < min_aspect
            }
            None => false,
        })
        .collect();

    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0] as usize;
        if id != 0 && erase[id] {
            binary.put_pixel(x, y, Luma([255]));
        }
    }

    erase.iter().filter(|&&e| e).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> GrayImage {
        GrayImage::from_pixel(60, 40, Luma([255u8]))
    }

    fn fill(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }

    #[test]
    fn speck_is_erased_glyph_is_kept() {
        let mut img = blank();
        fill(&mut img, 2, 2, 4, 3); // area 2
        fill(&mut img, 20, 10, 26, 20); // 6x10 glyph
        let erased = filter_components(&mut img, 6, 10.0);
        assert_eq!(erased, 1);
        assert_eq!(img.get_pixel(2, 2).0[0], 255);
        assert_eq!(img.get_pixel(22, 15).0[0], 0);
    }

    #[test]
    fn long_rule_is_erased() {
        let mut img = blank();
        fill(&mut img, 1, 30, 59, 32); // 58x2 line, aspect 29
        let erased = filter_components(&mut img, 6, 10.0);
        assert_eq!(erased, 1);
        assert!(img.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn diagonal_neighbours_are_separate_components() {
        let mut img = blank();
        img.put_pixel(10, 10, Luma([0]));
        img.put_pixel(11, 11, Luma([0]));
        assert_eq!(filter_components(&mut img, 2, 10.0), 2);
    }
}
