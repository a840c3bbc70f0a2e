//! Multipart uploads in, plaintext downloads out.

use std::io::Cursor;

use axum::{
    body::{Body, Bytes},
    extract::Multipart,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::{
    crypto::envelope::Plaintext,
    error::{AppError, Result},
};

/// The fields of an upload form.
pub struct UploadForm {
    pub bytes: Bytes,
    pub filename: String,
    pub expiry_hours: Option<String>,
}

/// Reads the `file` part (and `expiryHours`, if sent) from a multipart body.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut file: Option<(Bytes, String)> = None;
    let mut expiry_hours = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("file: {}", e)))?;
                file = Some((data, filename));
            }
            "expiryHours" => {
                expiry_hours = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("expiryHours: {}", e)))?,
                );
            }
            other => {
                tracing::debug!("Ignoring multipart field '{}'", other);
            }
        }
    }

    let (bytes, filename) = file.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    Ok(UploadForm {
        bytes,
        filename,
        expiry_hours,
    })
}

/// Makes a filename safe to quote inside `Content-Disposition`.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            '\n' | '\r' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Streams `plaintext` back as an attachment.
///
/// The buffer moves into the response body and is wiped when the body is
/// dropped, whether the transfer finished or the client went away.
pub fn attachment(filename: &str, plaintext: Plaintext) -> Response {
    let content_type = infer::get(plaintext.as_ref())
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(plaintext.len()));

    let disposition = HeaderValue::from_str(&format!(
        r#"attachment; filename="{}""#,
        sanitize_filename(filename)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    let body = Body::from_stream(ReaderStream::new(Cursor::new(plaintext)));
    (headers, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_quotes_and_control_characters() {
        assert_eq!(sanitize_filename("a\"b\\c\r\nd.txt"), "a_b_c__d.txt");
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
    }
}
