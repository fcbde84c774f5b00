//! Rendering harvested email lists into downloadable byte buffers.

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, XlsxError};

/// One address per line, no trailing newline.
pub fn render_lines(emails: &[String]) -> Vec<u8> {
    emails.join("\n").into_bytes()
}

/// CSV payload for the download surface: a bare single-column list with no
/// header row, same bytes as the plain-text export.
pub fn render_csv(emails: &[String]) -> Vec<u8> {
    render_lines(emails)
}

/// Styled single-sheet workbook: bold white-on-blue header, widened address
/// column, one address per row.
pub fn render_xlsx(emails: &[String]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("Email Addresses")?;

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4472C4))
        .set_align(FormatAlign::Center);
    sheet.write_with_format(0, 0, "Email Address", &header)?;
    sheet.set_column_width(0, 40.0)?;

    for (row, email) in emails.iter().enumerate() {
        sheet.write(row as u32 + 1, 0, email.as_str())?;
    }

    workbook.save_to_buffer()
}

/// Attachment file name derived from the search keywords, e.g.
/// `emails_rust_jobs.csv`. Falls back to `emails.{ext}` when keywords are
/// blank.
pub fn download_filename(keywords: &str, ext: &str) -> String {
    let trimmed = keywords.trim();
    if trimmed.is_empty() {
        return format!("emails.{ext}");
    }
    format!("emails_{}.{ext}", trimmed.replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<String> {
        vec!["a@corp.io".to_string(), "b@corp.io".to_string()]
    }

    #[test]
    fn lines_have_no_trailing_newline() {
        assert_eq!(render_lines(&sample()), b"a@corp.io\nb@corp.io".to_vec());
    }

    #[test]
    fn csv_is_the_bare_address_list() {
        // No header row: byte-identical to the plain-text payload.
        assert_eq!(render_csv(&sample()), render_lines(&sample()));
        assert_eq!(render_csv(&sample()), b"a@corp.io\nb@corp.io".to_vec());
    }

    #[test]
    fn xlsx_renders_a_zip_container() {
        let bytes = render_xlsx(&sample()).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }

    #[test]
    fn xlsx_handles_an_empty_list() {
        assert!(render_xlsx(&[]).is_ok());
    }

    #[test]
    fn filename_replaces_spaces() {
        assert_eq!(download_filename("rust jobs", "csv"), "emails_rust_jobs.csv");
        assert_eq!(download_filename("  ", "txt"), "emails.txt");
    }
}
