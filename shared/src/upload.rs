pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// Client-side filter for the upload control. The server still sniffs the
/// actual bytes, so a renamed text file gets through here and fails there.
pub fn is_accepted_upload(file_name: &str, mime_type: &str) -> bool {
    let mime_type = mime_type.to_ascii_lowercase();
    if ACCEPTED_MIME_TYPES.contains(&mime_type.as_str()) {
        return true;
    }

    // Pasted or dragged files sometimes arrive without a type
    mime_type.is_empty()
        && file_name
            .rsplit_once('.')
            .map(|(_, ext)| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

/// `0.9876` -> `"98.76%"`
pub fn format_percent(fraction: f32) -> String {
    format!("{:.2}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_and_jpeg_are_accepted() {
        assert!(is_accepted_upload("scan.png", "image/png"));
        assert!(is_accepted_upload("scan.JPG", "image/jpeg"));
        assert!(is_accepted_upload("pasted", "IMAGE/PNG"));
    }

    #[test]
    fn other_types_are_refused() {
        assert!(!is_accepted_upload("scan.gif", "image/gif"));
        assert!(!is_accepted_upload("notes.txt", "text/plain"));
        assert!(!is_accepted_upload("scan.webp", ""));
    }

    #[test]
    fn untyped_files_fall_back_to_extension() {
        assert!(is_accepted_upload("scan.jpeg", ""));
        assert!(!is_accepted_upload("scan", ""));
    }

    #[test]
    fn percent_has_two_decimals() {
        assert_eq!(format_percent(0.9876), "98.76%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.0), "0.00%");
    }
}
