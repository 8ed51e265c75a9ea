//! Pixel filters used by the cartoon pipeline
//!
//! All filters work on `image` buffers in memory and are pure apart from the
//! random number generator passed to k-means.

use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use rand::seq::index::sample;
use rand::Rng;

/// Median filter with a square `kernel` (odd) and replicated borders.
///
/// Uses a sliding histogram per row, so the cost per pixel grows with the
/// kernel width rather than its area.
pub fn median_blur(src: &GrayImage, kernel: u32) -> GrayImage {
    let (width, height) = src.dimensions();
    if kernel <= 1 || width == 0 || height == 0 {
        return src.clone();
    }

    let radius = (kernel / 2) as i64;
    let half = ((kernel * kernel) / 2) as u32;
    let at = |x: i64, y: i64| -> u8 {
        let x = x.clamp(0, width as i64 - 1) as u32;
        let y = y.clamp(0, height as i64 - 1) as u32;
        src.get_pixel(x, y)[0]
    };

    let mut out = GrayImage::new(width, height);
    for y in 0..height as i64 {
        let mut hist = [0u32; 256];
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                hist[at(dx, y + dy) as usize] += 1;
            }
        }

        // `median` is the smallest value with more than `half` samples at or below it
        let mut median = 0usize;
        let mut below = 0u32;
        settle_median(&hist, half, &mut median, &mut below);
        out.put_pixel(0, y as u32, Luma([median as u8]));

        for x in 1..width as i64 {
            for dy in -radius..=radius {
                let gone = at(x - radius - 1, y + dy) as usize;
                hist[gone] -= 1;
                if gone < median {
                    below -= 1;
                }
                let added = at(x + radius, y + dy) as usize;
                hist[added] += 1;
                if added < median {
                    below += 1;
                }
            }
            settle_median(&hist, half, &mut median, &mut below);
            out.put_pixel(x as u32, y as u32, Luma([median as u8]));
        }
    }
    out
}

fn settle_median(hist: &[u32; 256], half: u32, median: &mut usize, below: &mut u32) {
    while *below > half {
        *median -= 1;
        *below -= hist[*median];
    }
    while *below + hist[*median] <= half {
        *below += hist[*median];
        *median += 1;
    }
}

/// Adaptive mean threshold.
///
/// A pixel becomes 255 when it is brighter than the mean of its
/// `block` x `block` neighbourhood minus `offset`, otherwise 0. Near the
/// edges the window reads replicated border pixels, so every mean covers
/// a full block.
pub fn adaptive_threshold_mean(src: &GrayImage, block: u32, offset: i32) -> GrayImage {
    let (width, height) = src.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return GrayImage::new(width, height);
    }

    let radius = (block / 2) as usize;
    let (pw, ph) = (w + 2 * radius, h + 2 * radius);

    // Summed-area table over the padded image, with a zero row and column in front
    let mut integral = vec![0u64; (pw + 1) * (ph + 1)];
    for py in 0..ph {
        let sy = py.saturating_sub(radius).min(h - 1) as u32;
        let mut row_sum = 0u64;
        for px in 0..pw {
            let sx = px.saturating_sub(radius).min(w - 1) as u32;
            row_sum += src.get_pixel(sx, sy)[0] as u64;
            integral[(py + 1) * (pw + 1) + px + 1] = integral[py * (pw + 1) + px + 1] + row_sum;
        }
    }

    let side = 2 * radius + 1;
    let count = (side * side) as u64;
    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        // Window rows y..y+side in padded coordinates
        let (y0, y1) = (y, y + side);
        for x in 0..w {
            let (x0, x1) = (x, x + side);
            let sum = integral[y1 * (pw + 1) + x1] + integral[y0 * (pw + 1) + x0]
                - integral[y0 * (pw + 1) + x1]
                - integral[y1 * (pw + 1) + x0];
            let mean = ((sum + count / 2) / count) as i32;

            let value = src.get_pixel(x as u32, y as u32)[0] as i32;
            let bit = if value > mean - offset { 255 } else { 0 };
            out.put_pixel(x as u32, y as u32, Luma([bit]));
        }
    }
    out
}

/// Stopping rule for k-means
#[derive(Debug, Clone, Copy)]
pub struct KMeansCriteria {
    pub max_iterations: usize,
    /// Stop once no centre moves further than this
    pub epsilon: f32,
    /// Independent restarts; the most compact result wins
    pub attempts: usize,
}

impl Default for KMeansCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 0.2,
            attempts: 10,
        }
    }
}

/// k-means over RGB points with random initial centres
pub fn kmeans(
    points: &[[f32; 3]],
    k: usize,
    criteria: KMeansCriteria,
    rng: &mut impl Rng,
) -> Vec<[f32; 3]> {
    if points.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(points.len());

    let mut best: Option<(f32, Vec<[f32; 3]>)> = None;
    for _ in 0..criteria.attempts.max(1) {
        let centers = kmeans_once(points, k, criteria, rng);
        let compactness: f32 = points
            .iter()
            .map(|p| distance2(p, &centers[nearest(p, &centers)]))
            .sum();
        if best.as_ref().map_or(true, |(c, _)| compactness < *c) {
            best = Some((compactness, centers));
        }
    }
    best.map(|(_, centers)| centers).unwrap_or_default()
}

fn kmeans_once(
    points: &[[f32; 3]],
    k: usize,
    criteria: KMeansCriteria,
    rng: &mut impl Rng,
) -> Vec<[f32; 3]> {
    let mut centers: Vec<[f32; 3]> = sample(rng, points.len(), k)
        .into_iter()
        .map(|i| points[i])
        .collect();
    let limit = criteria.epsilon * criteria.epsilon;

    for _ in 0..criteria.max_iterations {
        let mut sums = vec![[0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for p in points {
            let c = nearest(p, &centers);
            counts[c] += 1;
            for ch in 0..3 {
                sums[c][ch] += p[ch] as f64;
            }
        }

        let mut max_shift = 0f32;
        for c in 0..k {
            let next = if counts[c] == 0 {
                // Empty cluster: restart it on a random point
                points[rng.gen_range(0..points.len())]
            } else {
                let n = counts[c] as f64;
                [
                    (sums[c][0] / n) as f32,
                    (sums[c][1] / n) as f32,
                    (sums[c][2] / n) as f32,
                ]
            };
            max_shift = max_shift.max(distance2(&centers[c], &next));
            centers[c] = next;
        }

        if max_shift <= limit {
            break;
        }
    }
    centers
}

fn distance2(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

/// Index of the centre closest to `p`
pub fn nearest(p: &[f32; 3], centers: &[[f32; 3]]) -> usize {
    let mut best = 0;
    let mut best_d = f32::MAX;
    for (i, c) in centers.iter().enumerate() {
        let d = distance2(p, c);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

/// Up to `limit` pixels picked at random, as k-means input
pub fn sample_pixels(img: &RgbImage, limit: usize, rng: &mut impl Rng) -> Vec<[f32; 3]> {
    let to_point = |p: &Rgb<u8>| [p[0] as f32, p[1] as f32, p[2] as f32];
    let total = img.width() as usize * img.height() as usize;

    if total <= limit {
        return img.pixels().map(to_point).collect();
    }
    let width = img.width() as usize;
    sample(rng, total, limit)
        .into_iter()
        .map(|i| to_point(img.get_pixel((i % width) as u32, (i / width) as u32)))
        .collect()
}

/// Replace every pixel by its nearest centre
pub fn quantize(img: &RgbImage, centers: &[[f32; 3]]) -> RgbImage {
    if centers.is_empty() {
        return img.clone();
    }
    let palette: Vec<Rgb<u8>> = centers
        .iter()
        .map(|c| Rgb([saturate(c[0]), saturate(c[1]), saturate(c[2])]))
        .collect();

    let mut out = img.clone();
    for p in out.pixels_mut() {
        let point = [p[0] as f32, p[1] as f32, p[2] as f32];
        *p = palette[nearest(&point, centers)];
    }
    out
}

/// Black out every pixel whose mask value is 0
pub fn apply_mask(img: &mut RgbImage, mask: &GrayImage) {
    for (x, y, p) in img.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == 0 {
            *p = Rgb([0, 0, 0]);
        }
    }
}

/// `saturate(|alpha * v + beta|)` on every channel
pub fn convert_scale_abs(img: &mut RgbImage, alpha: f32, beta: f32) {
    for p in img.pixels_mut() {
        for ch in p.0.iter_mut() {
            *ch = saturate((alpha * *ch as f32 + beta).abs());
        }
    }
}

/// Add white rows above and below
pub fn pad_white(img: &RgbImage, top: u32, bottom: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    let mut out = RgbImage::from_pixel(width, height + top + bottom, Rgb([255, 255, 255]));
    image::imageops::replace(&mut out, img, 0, top as i64);
    out
}

/// Alpha-composite `overlay` onto an opaque `base` of the same size
pub fn composite_over(base: &mut RgbaImage, overlay: &RgbaImage) {
    for (b, o) in base.pixels_mut().zip(overlay.pixels()) {
        let alpha_fg = o[3] as f32 / 255.0;
        let alpha_bg = b[3] as f32 / 255.0;
        for ch in 0..3 {
            let value = alpha_fg * o[ch] as f32 + alpha_bg * b[ch] as f32 * (1.0 - alpha_fg);
            b[ch] = saturate(value);
        }
        b[3] = saturate((1.0 - (1.0 - alpha_fg) * (1.0 - alpha_bg)) * 255.0);
    }
}

fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_median_removes_salt_noise() {
        let mut img = GrayImage::from_pixel(9, 9, Luma([40]));
        img.put_pixel(4, 4, Luma([255]));
        img.put_pixel(0, 0, Luma([255]));

        let out = median_blur(&img, 3);
        assert!(out.pixels().all(|p| p[0] == 40));
    }

    #[test]
    fn test_median_matches_brute_force() {
        let img = GrayImage::from_fn(12, 7, |x, y| Luma([((x * 37 + y * 91) % 251) as u8]));
        let out = median_blur(&img, 5);

        for y in 0..7i64 {
            for x in 0..12i64 {
                let mut window = Vec::new();
                for dy in -2..=2i64 {
                    for dx in -2..=2i64 {
                        let sx = (x + dx).clamp(0, 11) as u32;
                        let sy = (y + dy).clamp(0, 6) as u32;
                        window.push(img.get_pixel(sx, sy)[0]);
                    }
                }
                window.sort_unstable();
                assert_eq!(out.get_pixel(x as u32, y as u32)[0], window[12]);
            }
        }
    }

    #[test]
    fn test_threshold_flat_image_is_all_white() {
        let img = GrayImage::from_pixel(10, 10, Luma([128]));
        let out = adaptive_threshold_mean(&img, 9, 5);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_threshold_marks_dark_line() {
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x == 10 { 0 } else { 200 }]));
        let out = adaptive_threshold_mean(&img, 9, 5);
        assert_eq!(out.get_pixel(10, 10)[0], 0);
        assert_eq!(out.get_pixel(2, 10)[0], 255);
    }

    #[test]
    fn test_threshold_replicates_border() {
        let img = GrayImage::from_fn(12, 12, |x, _| Luma([if x < 2 { 100 } else { 120 }]));
        let out = adaptive_threshold_mean(&img, 5, 5);

        // Window at x=0 reads columns 0,0,0,1,2: mean 104, and 100 > 99.
        // Clipping the window to columns 0..=2 would give 107 and a black pixel.
        assert_eq!(out.get_pixel(0, 6)[0], 255);
        // Replicated rows make the corner match the rest of the column
        assert_eq!(out.get_pixel(0, 0)[0], 255);
        assert_eq!(out.get_pixel(0, 11)[0], 255);
    }

    #[test]
    fn test_kmeans_finds_two_colours() {
        let mut points = vec![[10.0, 10.0, 10.0]; 50];
        points.extend(vec![[240.0, 20.0, 20.0]; 50]);
        let mut rng = StdRng::seed_from_u64(3);

        let centers = kmeans(&points, 2, KMeansCriteria::default(), &mut rng);
        assert_eq!(centers.len(), 2);
        let dark = nearest(&[10.0, 10.0, 10.0], &centers);
        let red = nearest(&[240.0, 20.0, 20.0], &centers);
        assert_ne!(dark, red);
        assert!(distance2(&centers[red], &[240.0, 20.0, 20.0]) < 1.0);
    }

    #[test]
    fn test_kmeans_clamps_k_to_points() {
        let points = vec![[1.0, 2.0, 3.0]];
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(kmeans(&points, 8, KMeansCriteria::default(), &mut rng).len(), 1);
        assert!(kmeans(&[], 8, KMeansCriteria::default(), &mut rng).is_empty());
    }

    #[test]
    fn test_convert_scale_abs_saturates() {
        let mut img = RgbImage::from_pixel(1, 1, Rgb([0, 100, 200]));
        convert_scale_abs(&mut img, 1.3, 30.0);
        assert_eq!(img.get_pixel(0, 0), &Rgb([30, 160, 255]));
    }

    #[test]
    fn test_pad_white() {
        let img = RgbImage::from_pixel(4, 2, Rgb([1, 2, 3]));
        let out = pad_white(&img, 3, 1);
        assert_eq!(out.dimensions(), (4, 6));
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(0, 3), &Rgb([1, 2, 3]));
        assert_eq!(out.get_pixel(0, 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_composite_respects_overlay_alpha() {
        let mut base = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 200, 255]));
        let mut overlay = RgbaImage::new(2, 1);
        overlay.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        overlay.put_pixel(1, 0, Rgba([255, 0, 0, 0]));

        composite_over(&mut base, &overlay);
        assert_eq!(base.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(base.get_pixel(1, 0), &Rgba([0, 0, 200, 255]));
    }

    #[test]
    fn test_mask_blackens() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([9, 9, 9]));
        let mut mask = GrayImage::from_pixel(2, 1, Luma([255]));
        mask.put_pixel(1, 0, Luma([0]));
        apply_mask(&mut img, &mask);
        assert_eq!(img.get_pixel(0, 0), &Rgb([9, 9, 9]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }
}
