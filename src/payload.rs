//! Decoding of the `imageData` request field.
//!
//! Clients send either a data URL (`data:image/jpeg;base64,...`) or bare base64.
//! Text that is not valid base64 is handed to the detector as raw UTF-8 bytes,
//! minus any data-URL prefix, so that backends which ignore the image (the stub)
//! accept any non-empty string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload<'a> {
    raw: &'a str,
}

impl<'a> ImagePayload<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// MIME type declared by a data URL, if any.
    pub fn mime_type(&self) -> Option<&'a str> {
        let rest = self.raw.strip_prefix("data:")?;
        let (meta, _) = rest.split_once(',')?;
        let mime = meta.split(';').next().unwrap_or("");
        if mime.is_empty() {
            None
        } else {
            Some(mime)
        }
    }

    fn encoded(&self) -> &'a str {
        match self.raw.strip_prefix("data:").and_then(|r| r.split_once(',')) {
            Some((_, data)) => data,
            None => self.raw,
        }
    }

    /// Bytes to hand to a detector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let cleaned: String = self
            .encoded()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        match STANDARD.decode(cleaned.as_bytes()) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::debug!("image data is not base64 ({}); passing raw bytes", err);
                self.encoded().as_bytes().to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data_url() {
        let payload = ImagePayload::new("data:image/png;base64,aGVsbG8=");
        assert_eq!(payload.mime_type(), Some("image/png"));
        assert_eq!(payload.to_bytes(), b"hello");
    }

    #[test]
    fn decodes_bare_base64_with_line_breaks() {
        let payload = ImagePayload::new("aGVs\nbG8=");
        assert_eq!(payload.mime_type(), None);
        assert_eq!(payload.to_bytes(), b"hello");
    }

    #[test]
    fn falls_back_to_raw_bytes() {
        let payload = ImagePayload::new("not base64!");
        assert_eq!(payload.to_bytes(), b"not base64!");
    }

    #[test]
    fn data_url_fallback_drops_the_prefix() {
        let payload = ImagePayload::new("data:image/jpeg;base64,***raw***");
        assert_eq!(payload.mime_type(), Some("image/jpeg"));
        assert_eq!(payload.to_bytes(), b"***raw***");
    }
}
