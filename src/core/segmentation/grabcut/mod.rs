//! GrabCut foreground extraction: colour GMMs for foreground and background,
//! refined by alternating component assignment and an s/t min-cut over the
//! 8-connected pixel grid.
//!
//! The public surface is deliberately narrow: an RGB image, a seed rectangle
//! and an iteration count go in, a per-pixel [`Label`] grid comes out.

mod gmm;
mod graph;

use image::RgbImage;
use ndarray::Array2;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use gmm::{COMPONENTS, Color, Gmm};
use graph::FlowGraph;

/// Smoothness weight of the pairwise term.
const GAMMA: f64 = 50.0;
/// Terminal weight that pins definite labels.
const LAMBDA: f64 = 9.0 * GAMMA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Label {
    Background = 0,
    Foreground = 1,
    ProbableBackground = 2,
    ProbableForeground = 3,
}

impl Label {
    pub fn is_foreground(self) -> bool {
        matches!(self, Label::Foreground | Label::ProbableForeground)
    }

    fn is_probable(self) -> bool {
        matches!(self, Label::ProbableBackground | Label::ProbableForeground)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GrabCutError {
    #[error("seed rectangle {rect:?} is empty inside a {width}x{height} image")]
    EmptyRect { rect: Rect, width: u32, height: u32 },

    #[error("not enough {region} samples to fit a colour model: {count} < {}", COMPONENTS)]
    NotEnoughSamples { region: &'static str, count: usize },

    #[error("non-finite energy term")]
    NonFinite,

    #[error("no pixel was labelled foreground")]
    NoForeground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Whole image shrunk by `margin` pixels on each side.
    pub fn inset(width: u32, height: u32, margin: u32) -> Self {
        Self {
            x: margin,
            y: margin,
            width: width.saturating_sub(2 * margin),
            height: height.saturating_sub(2 * margin),
        }
    }

    fn clipped(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pairwise smoothness weights towards the left, up-left, up and up-right neighbours.
struct NeighborWeights {
    left: Array2<f64>,
    up_left: Array2<f64>,
    up: Array2<f64>,
    up_right: Array2<f64>,
}

fn color_diff(a: &Color, b: &Color) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

impl NeighborWeights {
    fn compute(colors: &Array2<Color>) -> Self {
        let (rows, cols) = colors.dim();
        let beta = contrast_beta(colors);
        let diag = GAMMA / std::f64::consts::SQRT_2;

        let mut left = Array2::zeros((rows, cols));
        let mut up_left = Array2::zeros((rows, cols));
        let mut up = Array2::zeros((rows, cols));
        let mut up_right = Array2::zeros((rows, cols));

        for y in 0..rows {
            for x in 0..cols {
                let c = &colors[[y, x]];
                if x > 0 {
                    left[[y, x]] = GAMMA * (-beta * color_diff(c, &colors[[y, x - 1]])).exp();
                }
                if y > 0 {
                    up[[y, x]] = GAMMA * (-beta * color_diff(c, &colors[[y - 1, x]])).exp();
                    if x > 0 {
                        up_left[[y, x]] =
                            diag * (-beta * color_diff(c, &colors[[y - 1, x - 1]])).exp();
                    }
                    if x + 1 < cols {
                        up_right[[y, x]] =
                            diag * (-beta * color_diff(c, &colors[[y - 1, x + 1]])).exp();
                    }
                }
            }
        }

        Self {
            left,
            up_left,
            up,
            up_right,
        }
    }
}

/// beta = 1 / (2 * mean squared colour difference between neighbours).
fn contrast_beta(colors: &Array2<Color>) -> f64 {
    let (rows, cols) = colors.dim();
    let mut sum = 0.0;
    let mut count = 0usize;
    for y in 0..rows {
        for x in 0..cols {
            let c = &colors[[y, x]];
            if x > 0 {
                sum += color_diff(c, &colors[[y, x - 1]]);
                count += 1;
            }
            if y > 0 {
                sum += color_diff(c, &colors[[y - 1, x]]);
                count += 1;
                if x > 0 {
                    sum += color_diff(c, &colors[[y - 1, x - 1]]);
                    count += 1;
                }
                if x + 1 < cols {
                    sum += color_diff(c, &colors[[y - 1, x + 1]]);
                    count += 1;
                }
            }
        }
    }
    if count == 0 || sum <= f64::EPSILON {
        0.0
    } else {
        1.0 / (2.0 * sum / count as f64)
    }
}

fn fit_models(colors: &Array2<Color>, labels: &Array2<Label>) -> Result<(Gmm, Gmm), GrabCutError> {
    let mut bgd = Vec::new();
    let mut fgd = Vec::new();
    for (c, l) in colors.iter().zip(labels.iter()) {
        if l.is_foreground() {
            fgd.push(*c);
        } else {
            bgd.push(*c);
        }
    }
    let bgd_gmm = Gmm::fit(&bgd).ok_or(GrabCutError::NotEnoughSamples {
        region: "background",
        count: bgd.len(),
    })?;
    let fgd_gmm = Gmm::fit(&fgd).ok_or(GrabCutError::NotEnoughSamples {
        region: "foreground",
        count: fgd.len(),
    })?;
    Ok((bgd_gmm, fgd_gmm))
}

/// Assign each pixel to its most likely component, then re-learn both models.
fn refine_models(colors: &Array2<Color>, labels: &Array2<Label>, bgd: &mut Gmm, fgd: &mut Gmm) {
    let assignments: Vec<usize> = colors
        .as_slice()
        .unwrap_or(&[])
        .par_iter()
        .zip(labels.as_slice().unwrap_or(&[]).par_iter())
        .map(|(c, l)| {
            if l.is_foreground() {
                fgd.most_likely_component(c)
            } else {
                bgd.most_likely_component(c)
            }
        })
        .collect();

    let labelled = || colors.iter().zip(labels.iter()).zip(assignments.iter().copied());
    bgd.learn(
        labelled()
            .filter(|((_, l), _)| !l.is_foreground())
            .map(|((c, _), k)| (c, k)),
    );
    fgd.learn(
        labelled()
            .filter(|((_, l), _)| l.is_foreground())
            .map(|((c, _), k)| (c, k)),
    );
}

fn neg_log(p: f64) -> f64 {
    -(p.max(f64::MIN_POSITIVE)).ln()
}

fn build_graph(
    colors: &Array2<Color>,
    labels: &Array2<Label>,
    bgd: &Gmm,
    fgd: &Gmm,
    weights: &NeighborWeights,
) -> Result<FlowGraph, GrabCutError> {
    let (rows, cols) = colors.dim();
    let n = rows * cols;

    let terminals: Vec<(f64, f64)> = colors
        .as_slice()
        .unwrap_or(&[])
        .par_iter()
        .zip(labels.as_slice().unwrap_or(&[]).par_iter())
        .map(|(c, l)| match l {
            Label::Background => (0.0, LAMBDA),
            Label::Foreground => (LAMBDA, 0.0),
            _ => (neg_log(bgd.density(c)), neg_log(fgd.density(c))),
        })
        .collect();

    if terminals.iter().any(|(s, t)| !s.is_finite() || !t.is_finite()) {
        return Err(GrabCutError::NonFinite);
    }

    let mut graph = FlowGraph::new(n, n * 5);
    for y in 0..rows {
        for x in 0..cols {
            let v = y * cols + x;
            let (source_w, sink_w) = terminals[v];
            graph.add_terminal_weights(v, source_w, sink_w);

            if x > 0 {
                let w = weights.left[[y, x]];
                graph.add_edge(v, v - 1, w, w);
            }
            if y > 0 {
                let w = weights.up[[y, x]];
                graph.add_edge(v, v - cols, w, w);
                if x > 0 {
                    let w = weights.up_left[[y, x]];
                    graph.add_edge(v, v - cols - 1, w, w);
                }
                if x + 1 < cols {
                    let w = weights.up_right[[y, x]];
                    graph.add_edge(v, v - cols + 1, w, w);
                }
            }
        }
    }
    Ok(graph)
}

/// Run GrabCut seeded with `rect`: pixels outside it are definite background,
/// pixels inside start as probable foreground. Only probable labels change
/// between iterations.
pub fn grabcut(image: &RgbImage, rect: Rect, iterations: usize) -> Result<Array2<Label>, GrabCutError> {
    let (width, height) = image.dimensions();
    let clipped = rect.clipped(width, height);
    if clipped.is_empty() {
        return Err(GrabCutError::EmptyRect {
            rect,
            width,
            height,
        });
    }

    let (rows, cols) = (height as usize, width as usize);
    let colors = Array2::from_shape_fn((rows, cols), |(y, x)| {
        let p = image.get_pixel(x as u32, y as u32);
        [f64::from(p[0]), f64::from(p[1]), f64::from(p[2])]
    });

    let (rx0, ry0) = (clipped.x as usize, clipped.y as usize);
    let (rx1, ry1) = (rx0 + clipped.width as usize, ry0 + clipped.height as usize);
    let mut labels = Array2::from_shape_fn((rows, cols), |(y, x)| {
        if (ry0..ry1).contains(&y) && (rx0..rx1).contains(&x) {
            Label::ProbableForeground
        } else {
            Label::Background
        }
    });

    let (mut bgd, mut fgd) = fit_models(&colors, &labels)?;
    let weights = NeighborWeights::compute(&colors);

    for iteration in 0..iterations {
        refine_models(&colors, &labels, &mut bgd, &mut fgd);
        let mut graph = build_graph(&colors, &labels, &bgd, &fgd, &weights)?;
        let flow = graph.max_flow();
        if !flow.is_finite() {
            return Err(GrabCutError::NonFinite);
        }
        let source_side = graph.source_side();

        let mut flipped = 0usize;
        for (label, &fg) in labels.iter_mut().zip(source_side.iter()) {
            if label.is_probable() {
                let next = if fg {
                    Label::ProbableForeground
                } else {
                    Label::ProbableBackground
                };
                if *label != next {
                    flipped += 1;
                }
                *label = next;
            }
        }
        debug!(
            "GrabCut iteration {}: flow={:.2}, relabelled={}",
            iteration + 1,
            flow,
            flipped
        );
    }

    // A cut that keeps nothing (e.g. a uniform frame whose colour models coincide)
    // is not a usable segmentation
    if !labels.iter().any(|l| l.is_foreground()) {
        return Err(GrabCutError::NoForeground);
    }
    Ok(labels)
}

/// Binary mask: 255 where the label is (probable) foreground, 0 elsewhere.
pub fn foreground_mask(labels: &Array2<Label>) -> Array2<u8> {
    labels.mapv(|l| if l.is_foreground() { 255 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn red_on_white(width: u32, height: u32, rect: (u32, u32, u32, u32)) -> RgbImage {
        let (x0, y0, x1, y1) = rect;
        RgbImage::from_fn(width, height, |x, y| {
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                Rgb([200, 40, 40])
            } else {
                Rgb([245, 245, 245])
            }
        })
    }

    #[test]
    fn test_inset_rect() {
        let r = Rect::inset(10, 8, 1);
        assert_eq!(
            r,
            Rect {
                x: 1,
                y: 1,
                width: 8,
                height: 6
            }
        );
        assert!(Rect::inset(2, 2, 1).is_empty());
    }

    #[test]
    fn test_empty_rect_is_an_error() {
        let img = RgbImage::new(2, 2);
        let err = grabcut(&img, Rect::inset(2, 2, 1), 2).unwrap_err();
        assert!(matches!(err, GrabCutError::EmptyRect { .. }));
    }

    #[test]
    fn test_tiny_image_lacks_samples() {
        let img = RgbImage::new(3, 3);
        let err = grabcut(&img, Rect::inset(3, 3, 1), 2).unwrap_err();
        assert_eq!(
            err,
            GrabCutError::NotEnoughSamples {
                region: "foreground",
                count: 1
            }
        );
    }

    #[test]
    fn test_uniform_frame_has_no_foreground() {
        let img = RgbImage::from_pixel(30, 40, Rgb([255, 0, 0]));
        let err = grabcut(&img, Rect::inset(30, 40, 1), 2).unwrap_err();
        assert_eq!(err, GrabCutError::NoForeground);
    }

    #[test]
    fn test_border_is_always_background() {
        let img = red_on_white(40, 30, (10, 8, 30, 22));
        let labels = grabcut(&img, Rect::inset(40, 30, 1), 2).unwrap();
        for x in 0..40 {
            assert_eq!(labels[[0, x]], Label::Background);
            assert_eq!(labels[[29, x]], Label::Background);
        }
        for y in 0..30 {
            assert_eq!(labels[[y, 0]], Label::Background);
            assert_eq!(labels[[y, 39]], Label::Background);
        }
    }

    #[test]
    fn test_separates_object_from_plain_background() {
        let img = red_on_white(60, 80, (15, 20, 45, 60));
        let labels = grabcut(&img, Rect::inset(60, 80, 1), 2).unwrap();
        let mask = foreground_mask(&labels);

        assert_eq!(mask[[40, 30]], 255);
        assert_eq!(mask[[21, 16]], 255);
        assert_eq!(mask[[5, 5]], 0);
        assert_eq!(mask[[75, 55]], 0);
        assert_eq!(mask[[40, 5]], 0);

        let fg = mask.iter().filter(|&&v| v == 255).count();
        let object = 30 * 40;
        assert!(fg >= object * 9 / 10 && fg <= object * 11 / 10, "fg={}", fg);
    }

    #[test]
    fn test_mask_is_binary() {
        let img = red_on_white(20, 20, (5, 5, 15, 15));
        let labels = grabcut(&img, Rect::inset(20, 20, 1), 1).unwrap();
        assert!(foreground_mask(&labels).iter().all(|&v| v == 0 || v == 255));
    }
}
