//! Page layout for the QR grid: US Letter geometry in PDF points, packed
//! row-major with the largest codes first.

use crate::error::EncodeError;

const INCH: f32 = 72.0;

pub const PAGE_WIDTH: f32 = 8.5 * INCH;
pub const PAGE_HEIGHT: f32 = 11.0 * INCH;

/// Top-left anchor of the QR region.
pub const START_X: f32 = 0.25 * INCH;
pub const START_Y: f32 = 10.25 * INCH;
/// Right boundary, mirroring the left margin.
pub const MAX_X: f32 = PAGE_WIDTH - START_X;
/// Lower boundary of the QR area when the plaintext caption band sits
/// below it.
pub const MIN_Y_CAPTION: f32 = 4.75 * INCH;
/// Lower boundary without a caption band.
pub const MIN_Y_BARE: f32 = 0.75 * INCH;
/// Spacing between neighboring QR codes.
pub const QR_MARGIN: f32 = 0.25 * INCH;

/// Positions of a code set across pages. Coordinates are PDF points with
/// the origin at the lower left; each position is the top-left corner of a
/// code.
#[derive(Debug)]
pub struct PageLayout {
    pub positions: Vec<(f32, f32)>,
    /// Half-open ranges into the code list, one per page.
    pub pages: Vec<(usize, usize)>,
}

/// Pack codes typewriter-style: left to right, dropping a row when the
/// right edge is hit, starting a new page when a row would cross the lower
/// boundary. Callers must order `side_lengths` largest first so row height
/// never grows mid-row.
pub fn lay_out_codes(
    side_lengths: &[f32],
    include_caption: bool,
) -> Result<PageLayout, EncodeError> {
    let min_y = if include_caption {
        MIN_Y_CAPTION
    } else {
        MIN_Y_BARE
    };

    let mut positions = Vec::with_capacity(side_lengths.len());
    let mut pages = Vec::new();
    let mut cur_x = START_X;
    let mut cur_y = START_Y;
    let mut last_height = 0.0;
    let mut page_start = 0;

    for (index, &side) in side_lengths.iter().enumerate() {
        if cur_x + side > MAX_X {
            cur_x = START_X;
            cur_y -= last_height + QR_MARGIN;
            if cur_y - side < min_y {
                cur_y = START_Y;
                pages.push((page_start, index));
                page_start = index;
            }
        }
        // The reference point may have moved, so re-check both bounds.
        if cur_x + side <= MAX_X && cur_y - side >= min_y {
            positions.push((cur_x, cur_y));
            cur_x += side + QR_MARGIN;
            last_height = side;
        } else {
            return Err(EncodeError::LayoutImpossible);
        }
    }
    pages.push((page_start, side_lengths.len()));

    Ok(PageLayout { positions, pages })
}
