//! Rasterize PDF pages into grayscale pixmaps via a Pdfium dynamic
//! library, at the resolution the scanner expects.

use crate::consts::DPI;
use crate::error::DecodeError;
use image::GrayImage;
use pdfium_render::prelude::*;
use tracing::debug;

pub(crate) fn render_page_images(pdf_bytes: &[u8]) -> Result<Vec<GrayImage>, DecodeError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| DecodeError::PdfRender(e.to_string()))?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| DecodeError::PdfRender(e.to_string()))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(DPI / 72.0);
    let mut images = Vec::new();
    for page in document.pages().iter() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DecodeError::PdfRender(e.to_string()))?;
        images.push(bitmap.as_image().to_luma8());
    }
    debug!(pages = images.len(), "rendered page images from PDF document");
    Ok(images)
}
