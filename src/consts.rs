use std::sync::LazyLock;

/// QR version the capacity budget is computed against. A grid of codes of
/// this size fits cleanly into US Letter pages with 6-pixel modules.
pub const QR_SIZE: usize = 22;

/// Side length of one QR module, in pixels, when codes are rasterized or
/// placed on a page (pages embed codes at [`DPI`] dots per inch).
pub const BOX_SIZE: u32 = 6;

/// How many error-correction QR codes to generate per QR code of document
/// content, applied as `ceil(num_qr * EC_CODE_PROPORTION)`.
pub const EC_CODE_PROPORTION: f64 = 0.2;

/// Resolution at which PDF pages are rasterized for scanning, and at which
/// QR images are embedded on the encode side.
pub const DPI: f32 = 300.0;

/// Byte-mode capacities of QR versions 1..=40, one row per version, columns
/// ordered L, M, Q, H.
pub static QR_CAPACITIES: LazyLock<Vec<[usize; 4]>> = LazyLock::new(|| {
    include_str!("data/qr_capacity.csv")
        .lines()
        .skip(1)
        .map(|line| {
            let mut row = [0usize; 4];
            for (slot, field) in row.iter_mut().zip(line.split(',')) {
                *slot = field
                    .trim()
                    .parse()
                    .expect("malformed bundled QR capacity table");
            }
            row
        })
        .collect()
});

/// Look up the byte capacity of a QR `version` at error-correction column
/// `column` (0 = L .. 3 = H).
pub fn qr_capacity(version: usize, column: usize) -> usize {
    QR_CAPACITIES[version - 1][column]
}
