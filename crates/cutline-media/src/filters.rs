//! FFmpeg filter graph and demuxer manifest builders.

use cutline_models::OverlaySpec;
use std::path::Path;

/// Output label of the overlay chain.
pub const OVERLAY_OUTPUT_LABEL: &str = "vout";

/// Placement of one overlay layer on the base video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    pub x: i32,
    pub y: i32,
    /// Visible only between these output times when set
    pub enable: Option<(f64, f64)>,
}

impl From<&OverlaySpec> for OverlayPlacement {
    fn from(spec: &OverlaySpec) -> Self {
        Self {
            x: spec.x,
            y: spec.y,
            enable: spec.enable_window(),
        }
    }
}

/// Build a pairwise overlay chain over inputs `0..=placements.len()`.
///
/// Input 0 is the base video and input `i` is placed by `placements[i - 1]`.
/// Every step feeds the previous result into the next overlay, ending at
/// `[vout]`.
///
/// ```
/// use cutline_media::filters::{build_overlay_chain, OverlayPlacement};
/// let chain = build_overlay_chain(&[
///     OverlayPlacement { x: 10, y: 20, enable: None },
///     OverlayPlacement { x: 0, y: 0, enable: Some((5.0, 10.0)) },
/// ]);
/// assert_eq!(
///     chain,
///     "[0:v][1:v]overlay=x=10:y=20[v1];[v1][2:v]overlay=x=0:y=0:enable='between(t,5,10)'[vout]"
/// );
/// ```
pub fn build_overlay_chain(placements: &[OverlayPlacement]) -> String {
    let last = placements.len();
    placements
        .iter()
        .enumerate()
        .map(|(i, placement)| {
            let input = i + 1;
            let base = if i == 0 {
                "0:v".to_string()
            } else {
                format!("v{}", i)
            };
            let out = if input == last {
                OVERLAY_OUTPUT_LABEL.to_string()
            } else {
                format!("v{}", input)
            };
            let enable = placement
                .enable
                .map(|(start, end)| format!(":enable='between(t,{},{})'", start, end))
                .unwrap_or_default();
            format!(
                "[{}][{}:v]overlay=x={}:y={}{}[{}]",
                base, input, placement.x, placement.y, enable, out
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Contents of a concat demuxer manifest listing `paths` in order.
pub fn concat_manifest<P: AsRef<Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|p| {
            // Single quotes close, escape, and reopen inside a quoted path
            let escaped = p.as_ref().to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

/// Filter sampling one frame every `interval_secs`, scaled to `width`x`height`.
pub fn thumbnail_filter(interval_secs: f64, width: u32, height: u32) -> String {
    format!("fps=1/{:.6},scale={}:{}", interval_secs, width, height)
}
