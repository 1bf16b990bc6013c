//! Well-known MIME media types.

use std::fmt;

/// MIME media type of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MediaType {
    /// `text/plain`
    TextPlain,
    /// `text/html`
    TextHtml,
    /// `text/csv`
    TextCsv,
    /// `text/css`
    TextCss,
    /// `text/calendar`
    TextCalendar,
    /// `text/xml`
    TextXml,
    /// `application/json`
    ApplicationJson,
    /// `application/pdf`
    ApplicationPdf,
    /// `application/zip`
    ApplicationZip,
    /// `application/gzip`
    ApplicationGzip,
    /// `application/xml`
    ApplicationXml,
    /// `application/octet-stream`
    ApplicationOctetStream,
    /// `image/png`
    ImagePng,
    /// `image/jpeg`
    ImageJpeg,
    /// `image/gif`
    ImageGif,
    /// `image/svg+xml`
    ImageSvg,
    /// `image/webp`
    ImageWebp,
    /// `audio/mpeg`
    AudioMpeg,
    /// `video/mp4`
    VideoMp4,
    /// `multipart/mixed`
    MultipartMixed,
    /// `multipart/alternative`
    MultipartAlternative,
}

impl MediaType {
    /// Returns the `type/subtype` string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextPlain => "text/plain",
            Self::TextHtml => "text/html",
            Self::TextCsv => "text/csv",
            Self::TextCss => "text/css",
            Self::TextCalendar => "text/calendar",
            Self::TextXml => "text/xml",
            Self::ApplicationJson => "application/json",
            Self::ApplicationPdf => "application/pdf",
            Self::ApplicationZip => "application/zip",
            Self::ApplicationGzip => "application/gzip",
            Self::ApplicationXml => "application/xml",
            Self::ApplicationOctetStream => "application/octet-stream",
            Self::ImagePng => "image/png",
            Self::ImageJpeg => "image/jpeg",
            Self::ImageGif => "image/gif",
            Self::ImageSvg => "image/svg+xml",
            Self::ImageWebp => "image/webp",
            Self::AudioMpeg => "audio/mpeg",
            Self::VideoMp4 => "video/mp4",
            Self::MultipartMixed => "multipart/mixed",
            Self::MultipartAlternative => "multipart/alternative",
        }
    }

    /// Checks if this is a plain text type, safe to send as text.
    #[must_use]
    pub const fn is_plain_text(self) -> bool {
        matches!(
            self,
            Self::TextPlain
                | Self::TextHtml
                | Self::TextCsv
                | Self::TextCss
                | Self::TextCalendar
                | Self::TextXml
        )
    }

    /// Checks if this is a multipart type.
    #[must_use]
    pub const fn is_multipart(self) -> bool {
        matches!(self, Self::MultipartMixed | Self::MultipartAlternative)
    }

    /// Looks up the media type for a file extension.
    ///
    /// The lookup is case-insensitive and accepts a leading dot.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        let media_type = match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" | "log" => Self::TextPlain,
            "html" | "htm" => Self::TextHtml,
            "csv" => Self::TextCsv,
            "css" => Self::TextCss,
            "ics" => Self::TextCalendar,
            "xml" => Self::TextXml,
            "json" => Self::ApplicationJson,
            "pdf" => Self::ApplicationPdf,
            "zip" => Self::ApplicationZip,
            "gz" => Self::ApplicationGzip,
            "bin" => Self::ApplicationOctetStream,
            "png" => Self::ImagePng,
            "jpg" | "jpeg" => Self::ImageJpeg,
            "gif" => Self::ImageGif,
            "svg" => Self::ImageSvg,
            "webp" => Self::ImageWebp,
            "mp3" => Self::AudioMpeg,
            "mp4" => Self::VideoMp4,
            _ => return None,
        };
        Some(media_type)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(MediaType::from_extension("pdf"), Some(MediaType::ApplicationPdf));
        assert_eq!(MediaType::from_extension(".CSV"), Some(MediaType::TextCsv));
        assert_eq!(MediaType::from_extension("jpeg"), Some(MediaType::ImageJpeg));
        assert_eq!(MediaType::from_extension("exe"), None);
        assert_eq!(MediaType::from_extension(""), None);
    }

    #[test]
    fn test_plain_text() {
        assert!(MediaType::TextPlain.is_plain_text());
        assert!(MediaType::TextHtml.is_plain_text());
        assert!(!MediaType::ApplicationJson.is_plain_text());
        assert!(!MediaType::ImagePng.is_plain_text());
    }

    #[test]
    fn test_display() {
        assert_eq!(MediaType::ImageSvg.to_string(), "image/svg+xml");
        assert!(MediaType::MultipartMixed.is_multipart());
    }
}
