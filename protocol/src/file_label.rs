//! Short labels used when rendering attachment chips.

/// Maximum number of characters of a file name shown on a chip.
pub const CHIP_NAME_MAX_CHARS: usize = 13;

const MIME_SHORT_LABELS: &[(&str, &str)] = &[
    ("text/csv", "CSV"),
    ("application/pdf", "PDF"),
    ("image/jpeg", "JPG"),
    ("image/png", "PNG"),
    ("text/plain", "TXT"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "XLSX",
    ),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "DOCX",
    ),
    ("application/zip", "ZIP"),
    ("application/x-rar-compressed", "RAR"),
    ("application/x-7z-compressed", "7Z"),
    ("application/x-gzip", "GZ"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "PPT",
    ),
    ("application/msword", "DOC"),
    ("application/vnd.ms-excel", "XLS"),
    ("application/vnd.ms-powerpoint", "PPT"),
    ("application/vnd.oasis.opendocument.text", "ODT"),
    ("application/vnd.oasis.opendocument.spreadsheet", "ODS"),
    ("image/gif", "GIF"),
    ("image/svg+xml", "SVG"),
    ("image/tiff", "TIFF"),
    ("image/bmp", "BMP"),
    ("image/webp", "WEBP"),
    ("image/heic", "HEIC"),
    ("image/heif", "HEIF"),
    ("image/avif", "AVIF"),
    ("image/ico", "ICO"),
    ("image/vnd.microsoft.icon", "ICO"),
    ("image/x-icon", "ICO"),
    ("image/vnd.djvu", "DJVU"),
];

/// Maps a MIME type to the short label shown on a chip ("PDF", "PNG", ...).
/// Unknown types map to `"File"`.
pub fn mime_short_label(mime_type: &str) -> &'static str {
    MIME_SHORT_LABELS
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(mime_type))
        .map(|(_, label)| *label)
        .unwrap_or("File")
}

/// Formats a byte count in megabytes with two decimals (`"1.50 MB"`).
pub fn format_size_mb(size_bytes: u64) -> String {
    let mb = size_bytes as f64 / 1024.0 / 1024.0;
    format!("{mb:.2} MB")
}

/// Shortens `name` to `max_chars` characters, ending in `...` when cut.
pub fn truncate_file_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = name.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_and_unknown_labels() {
        assert_eq!(mime_short_label("application/pdf"), "PDF");
        assert_eq!(mime_short_label("IMAGE/X-ICON"), "ICO");
        assert_eq!(mime_short_label("application/exe"), "File");
    }

    #[test]
    fn size_is_rendered_in_megabytes() {
        assert_eq!(format_size_mb(0), "0.00 MB");
        assert_eq!(format_size_mb(1_572_864), "1.50 MB");
    }

    #[test]
    fn long_names_are_cut_to_chip_width() {
        assert_eq!(truncate_file_name("short.pdf", CHIP_NAME_MAX_CHARS), "short.pdf");
        assert_eq!(
            truncate_file_name("quarterly-report.pdf", CHIP_NAME_MAX_CHARS),
            "quarterly-..."
        );
        assert_eq!(truncate_file_name("ünïcödé-náme.txt", 8), "ünïcö...");
    }
}
