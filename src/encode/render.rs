//! Render a laid-out QR code set into a PDF via `printpdf`.

use super::layout::{self, PAGE_HEIGHT, PAGE_WIDTH, QR_MARGIN, START_X, START_Y};
use super::EncodeOptions;
use crate::consts::{BOX_SIZE, DPI};
use crate::error::EncodeError;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Pt, Svg};
use qrcode::render::svg;
use qrcode::QrCode;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Side of one module on the page, in points: modules are [`BOX_SIZE`]
/// pixels and pages carry them at [`DPI`].
const PT_PER_MODULE: f32 = BOX_SIZE as f32 * 72.0 / DPI;

/// Courier advance width, as a fraction of the font size.
const COURIER_CHAR_WIDTH: f32 = 600.0 / 1000.0;

/// Caption band: escaped document text, monospace.
const CAPTION_FONT_SIZE: f32 = 5.0;
const CAPTION_LINE_HEIGHT: f32 = 6.0;
const CAPTION_CHARS_PER_LINE: usize = 192;
const CAPTION_LINES_PER_PAGE: usize = 45;
const CAPTION_CHARS_PER_PAGE: usize = CAPTION_CHARS_PER_LINE * CAPTION_LINES_PER_PAGE;

pub(crate) fn write_pdf<W: Write>(
    mut qr_codes: Vec<QrCode>,
    options: &EncodeOptions,
    caption_text: &str,
    writer: &mut W,
) -> Result<(), EncodeError> {
    // Largest first, so the layout's row heights never grow mid-row.
    qr_codes.sort_by(|a, b| b.width().cmp(&a.width()));
    let sides: Vec<f32> = qr_codes
        .iter()
        .map(|code| code.width() as f32 * PT_PER_MODULE)
        .collect();
    let page_layout = layout::lay_out_codes(&sides, true)?;
    let caption_pages = split_caption_text(caption_text);
    let page_count = page_layout.pages.len();
    debug!(qr_codes = qr_codes.len(), page_count, "rendering PDF pages");

    let render_time = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let (doc_title, footer_base) = match options.document_name.as_deref() {
        Some(name) => (
            format!("QR Encoding of {name}"),
            format!("Content from {} at {render_time}", printable_filename(name)),
        ),
        None => (
            "QR Encoded Document".to_string(),
            format!("Encoded at {render_time}"),
        ),
    };

    let (doc, first_page, first_layer) =
        PdfDocument::new(doc_title, Mm::from(Pt(PAGE_WIDTH)), Mm::from(Pt(PAGE_HEIGHT)), "");
    let courier = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| EncodeError::PdfWrite(e.to_string()))?;

    let mut page_index = first_page;
    let mut layer_index = first_layer;
    for (page_num, &(start, end)) in page_layout.pages.iter().enumerate() {
        if page_num > 0 {
            (page_index, layer_index) =
                doc.add_page(Mm::from(Pt(PAGE_WIDTH)), Mm::from(Pt(PAGE_HEIGHT)), "");
        }
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for code_index in start..end {
            let svg_string = qr_codes[code_index]
                .render::<svg::Color>()
                .quiet_zone(false)
                .module_dimensions(1, 1)
                .build();
            let parsed =
                Svg::parse(&svg_string).map_err(|e| EncodeError::PdfWrite(e.to_string()))?;
            let (x, y) = page_layout.positions[code_index];
            parsed.add_to_layer(
                &layer,
                printpdf::svg::SvgTransform {
                    translate_x: Some(Pt(x)),
                    // Layout anchors are top-left; the image origin is its
                    // lower-left corner.
                    translate_y: Some(Pt(y - sides[code_index])),
                    rotate: None,
                    scale_x: Some(BOX_SIZE as f32),
                    scale_y: Some(BOX_SIZE as f32),
                    dpi: Some(DPI),
                },
            );
        }

        let footer_text = format!("{footer_base}, Page {} of {page_count}", page_num + 1);
        draw_header_footer(&layer, &options.header_text, &footer_text, &courier);

        if page_num < caption_pages.len() {
            let is_last_page = page_num + 1 == page_count;
            if is_last_page && caption_pages.len() > page_count {
                let remaining: usize = caption_pages[page_count..]
                    .iter()
                    .map(|text| text.chars().count())
                    .sum();
                draw_overflow_notice(&layer, remaining, &courier);
            }
            draw_page_caption(&layer, &caption_pages[page_num], &courier);
        }
    }

    let mut buffered = BufWriter::new(writer);
    doc.save(&mut buffered)
        .map_err(|e| EncodeError::PdfWrite(e.to_string()))?;
    Ok(())
}

/// Escape the document text and cut it into per-page caption chunks.
fn split_caption_text(text: &str) -> Vec<String> {
    let escaped: Vec<char> = text.chars().flat_map(|c| c.escape_debug()).collect();
    if escaped.is_empty() {
        return Vec::new();
    }
    escaped
        .chunks(CAPTION_CHARS_PER_PAGE)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn draw_centered_text(
    layer: &PdfLayerReference,
    text: &str,
    font_size: f32,
    y: f32,
    font: &IndirectFontRef,
) {
    let text_width = font_size * text.chars().count() as f32 * COURIER_CHAR_WIDTH;
    let x = (PAGE_WIDTH - text_width) / 2.0;
    layer.use_text(text, font_size, Mm::from(Pt(x)), Mm::from(Pt(y)), font);
}

fn draw_header_footer(
    layer: &PdfLayerReference,
    header_text: &str,
    footer_text: &str,
    courier: &IndirectFontRef,
) {
    if !header_text.is_empty() {
        draw_centered_text(layer, header_text, 12.0, 10.5 * 72.0, courier);
        draw_centered_text(layer, header_text, 12.0, 0.25 * 72.0, courier);
    }
    draw_centered_text(layer, footer_text, 8.0, 0.5 * 72.0, courier);
    // Producer marker in the top-left corner, above the QR region.
    layer.use_text(
        concat!("QRDM v", env!("CARGO_PKG_VERSION")),
        8.0,
        Mm::from(Pt(START_X)),
        Mm::from(Pt(START_Y + QR_MARGIN)),
        courier,
    );
}

fn draw_page_caption(layer: &PdfLayerReference, text: &str, courier: &IndirectFontRef) {
    let chars: Vec<char> = text.chars().collect();
    layer.begin_text_section();
    layer.set_font(courier, CAPTION_FONT_SIZE);
    layer.set_text_cursor(
        Mm::from(Pt(START_X)),
        Mm::from(Pt(layout::MIN_Y_CAPTION - CAPTION_LINE_HEIGHT)),
    );
    layer.set_line_height(CAPTION_LINE_HEIGHT);
    for line in chars.chunks(CAPTION_CHARS_PER_LINE) {
        layer.write_text(line.iter().collect::<String>(), courier);
        layer.add_line_break();
    }
    layer.end_text_section();
}

fn draw_overflow_notice(layer: &PdfLayerReference, remaining_chars: usize, courier: &IndirectFontRef) {
    let text = format!(
        "NOTICE: Remaining source content text omitted due to length. ({remaining_chars} characters)"
    );
    draw_centered_text(layer, &text, 8.0, 0.75 * 72.0, courier);
}

/// Shorten long document names for the footer.
fn printable_filename(name: &str) -> String {
    let path = Path::new(name);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    if file_name.chars().count() <= 40 {
        return file_name;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "{} ... .{extension}",
        stem.chars().take(30).collect::<String>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_splits_on_page_boundaries() {
        let pages = split_caption_text(&"x".repeat(CAPTION_CHARS_PER_PAGE + 10));
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].chars().count(), CAPTION_CHARS_PER_PAGE);
        assert_eq!(pages[1].chars().count(), 10);
    }

    #[test]
    fn caption_escapes_control_characters() {
        let pages = split_caption_text("a\nb\tc");
        assert_eq!(pages, vec!["a\\nb\\tc".to_string()]);
    }

    #[test]
    fn empty_caption_renders_no_pages() {
        assert!(split_caption_text("").is_empty());
    }

    #[test]
    fn long_filenames_are_shortened() {
        let name = format!("{}.txt", "a".repeat(60));
        let printable = printable_filename(&name);
        assert!(printable.chars().count() < 40);
        assert!(printable.ends_with(".txt"));
        assert_eq!(printable_filename("notes.txt"), "notes.txt");
    }
}
