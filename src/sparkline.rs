// src/sparkline.rs
use serde::Serialize;
use std::fmt::Write;

pub const VIEW_WIDTH: f64 = 100.0;
pub const VIEW_HEIGHT: f64 = 40.0;
/// Vertical span the series may occupy; the rest is headroom at the top.
const PLOT_HEIGHT: f64 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SparkPoint {
    pub x: f64,
    pub y: f64,
}

/// Maps prices into the fixed 100x40 viewport. The minimum lands on the
/// baseline (y = 40) and the maximum at y = 5.
pub fn points(prices: &[f64]) -> Vec<SparkPoint> {
    if prices.is_empty() {
        return Vec::new();
    }

    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max - min == 0.0 { 1.0 } else { max - min };
    let last = prices.len() - 1;

    prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let x = if last == 0 {
                0.0
            } else {
                i as f64 / last as f64 * VIEW_WIDTH
            };
            let y = VIEW_HEIGHT - ((price - min) / range) * PLOT_HEIGHT;
            SparkPoint { x, y }
        })
        .collect()
}

/// SVG path for a filled sparkline: the polyline followed by a drop to the
/// baseline so the shape can be area-filled. Empty input gives an empty path.
pub fn path(prices: &[f64]) -> String {
    let points = points(prices);
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };

    let mut d = format!("M{},{}", first.x, first.y);
    for p in rest {
        let _ = write!(d, " L{},{}", p.x, p.y);
    }
    let _ = write!(
        d,
        " L{},{} L0,{} Z",
        VIEW_WIDTH, VIEW_HEIGHT, VIEW_HEIGHT
    );
    d
}
