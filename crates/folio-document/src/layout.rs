// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page layout — contain-to-width scaling and centering.

use folio_core::{Dimensions, PageLayout, PaperSize};

/// Place an image of `natural` pixels on `page`.
///
/// Pixels map 1:1 onto points. Images wider than the page are scaled down to
/// the page width; narrower images keep their size. Height follows the same
/// factor, without regard to the page height, so a tall image may extend past
/// the top and bottom edges (negative `offset_y`). The result is always
/// centered on the page.
pub fn layout(natural: Dimensions, page: PaperSize) -> PageLayout {
    let (page_width, page_height) = page.dimensions_pt();
    layout_on(natural.width as f64, natural.height as f64, page_width, page_height)
}

/// [`layout`] on an A4 canvas (595x842 pt).
pub fn layout_a4(width: u32, height: u32) -> PageLayout {
    layout(Dimensions::new(width, height), PaperSize::A4)
}

fn layout_on(native_width: f64, native_height: f64, page_width: f64, page_height: f64) -> PageLayout {
    debug_assert!(
        native_width > 0.0 && native_height > 0.0,
        "image dimensions must be positive"
    );

    let render_width = native_width.min(page_width);
    let render_height = native_height * (render_width / native_width);

    PageLayout {
        render_width,
        render_height,
        offset_x: (page_width - render_width) / 2.0,
        offset_y: (page_height - render_height) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_centered(l: &PageLayout) {
        assert!((l.offset_x + l.render_width / 2.0 - 595.0 / 2.0).abs() < EPS);
        assert!((l.offset_y + l.render_height / 2.0 - 842.0 / 2.0).abs() < EPS);
    }

    #[test]
    fn tall_jpeg_scales_to_width_and_overflows_height() {
        let l = layout_a4(1000, 2000);
        assert!((l.render_width - 595.0).abs() < EPS);
        assert!((l.render_height - 1190.0).abs() < EPS);
        assert!(l.offset_x.abs() < EPS);
        assert!((l.offset_y - (842.0 - 1190.0) / 2.0).abs() < EPS);
        assert!(l.offset_y < 0.0);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let l = layout_a4(200, 100);
        assert_eq!(l.render_width, 200.0);
        assert_eq!(l.render_height, 100.0);
        assert_eq!(l.offset_x, 197.5);
        assert_eq!(l.offset_y, 371.0);
    }

    #[test]
    fn exact_page_width_fills_width() {
        let l = layout_a4(595, 842);
        assert_eq!((l.offset_x, l.offset_y), (0.0, 0.0));
    }

    #[test]
    fn invariants_hold_across_shapes() {
        let sizes = [
            (1, 1),
            (1, 10_000),
            (10_000, 1),
            (596, 3),
            (3000, 4000),
            (4000, 3000),
            (640, 480),
            (12_345, 678),
        ];
        for (w, h) in sizes {
            let l = layout_a4(w, h);
            assert!(l.render_width <= 595.0, "{w}x{h}");
            let ratio = l.render_height / l.render_width;
            let expected = h as f64 / w as f64;
            assert!((ratio - expected).abs() <= expected * EPS, "{w}x{h}");
            assert_centered(&l);
        }
    }

    #[test]
    fn layout_is_deterministic() {
        assert_eq!(layout_a4(1234, 987), layout_a4(1234, 987));
    }

    #[test]
    fn custom_page_size_is_respected() {
        let page = PaperSize::Letter;
        let l = layout(Dimensions::new(1224, 100), page);
        assert_eq!(l.render_width, 612.0);
        assert_eq!(l.render_height, 50.0);
        assert_eq!(l.offset_y, (792.0 - 50.0) / 2.0);
    }
}
