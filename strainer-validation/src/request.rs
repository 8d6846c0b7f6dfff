//! HTTP request decoding into data sources

use crate::errors::{Error, Result};
use crate::source::{DataSource, FormData, MapData};
use http::{Method, Request, header};

/// Uploaded file data
#[derive(Debug, Clone, PartialEq)]
pub struct FormFile {
    /// Original filename
    pub filename: String,

    /// Content type (MIME type)
    pub content_type: String,

    /// File size in bytes
    pub size: usize,

    /// File data
    pub data: Vec<u8>,
}

impl FormFile {
    /// Create a new form file
    pub fn new(filename: String, content_type: String, data: Vec<u8>) -> Self {
        let size = data.len();
        Self {
            filename,
            content_type,
            size,
            data,
        }
    }

    /// File extension, lowercased. `None` when the name has no dot.
    pub fn extension(&self) -> Option<String> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Mime type without parameters, e.g. `text/plain` for
    /// `text/plain; charset=utf-8`.
    pub fn mime(&self) -> &str {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
    }

    /// Check if file is an image, by mime type or extension
    pub fn is_image(&self) -> bool {
        if self.mime().starts_with("image/") {
            return true;
        }
        matches!(
            self.extension().as_deref(),
            Some("jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" | "ico")
        )
    }
}

/// Multipart form data parser
pub struct MultipartParser {
    boundary: String,
}

impl MultipartParser {
    /// Create a new multipart parser from Content-Type header
    pub fn from_content_type(content_type: &str) -> Result<Self> {
        // multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW
        let boundary = content_type
            .split(';')
            .find_map(|part| {
                part.trim()
                    .strip_prefix("boundary=")
                    .map(|b| b.trim_matches('"').to_string())
            })
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                Error::InvalidDataSource("missing boundary in Content-Type".to_string())
            })?;

        Ok(Self { boundary })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parse a multipart body into form values and files.
    ///
    /// The body is split as bytes; file contents are kept verbatim.
    pub fn parse(&self, body: &[u8]) -> Result<FormData> {
        let marker = format!("--{}", self.boundary);
        let mut form = FormData::default();

        for part in split_bytes(body, marker.as_bytes()).into_iter().skip(1) {
            let trimmed = part.trim_ascii();
            if trimmed.is_empty() || trimmed == b"--" {
                continue;
            }
            self.parse_part(part, &mut form)?;
        }

        Ok(form)
    }

    fn parse_part(&self, part: &[u8], form: &mut FormData) -> Result<()> {
        let start = part
            .iter()
            .position(|b| *b != b'\r' && *b != b'\n')
            .unwrap_or(part.len());
        let part = &part[start..];

        let (head, content) = match find_bytes(part, b"\r\n\r\n") {
            Some(i) => (&part[..i], &part[i + 4..]),
            None => match find_bytes(part, b"\n\n") {
                Some(i) => (&part[..i], &part[i + 2..]),
                None => (part, &[][..]),
            },
        };
        let content = content
            .strip_suffix(b"\r\n")
            .or_else(|| content.strip_suffix(b"\n"))
            .unwrap_or(content);

        let head = String::from_utf8_lossy(head);
        let mut name = None;
        let mut filename = None;
        let mut content_type = None;

        for line in head.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            if key.trim().eq_ignore_ascii_case("content-disposition") {
                for attr in value.split(';') {
                    let attr = attr.trim();
                    if let Some(v) = attr.strip_prefix("name=") {
                        name = Some(v.trim_matches('"').to_string());
                    } else if let Some(v) = attr.strip_prefix("filename=") {
                        filename = Some(v.trim_matches('"').to_string());
                    }
                }
            } else if key.trim().eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_string());
            }
        }

        let name = name
            .ok_or_else(|| Error::InvalidDataSource("multipart part without a name".to_string()))?;

        match filename {
            Some(filename) => form.add_file(
                name,
                FormFile::new(
                    filename,
                    content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
                    content.to_vec(),
                ),
            ),
            None => form.add(name, String::from_utf8_lossy(content)),
        }
        Ok(())
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split_bytes<'a>(body: &'a [u8], marker: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut rest = body;
    while let Some(i) = find_bytes(rest, marker) {
        parts.push(&rest[..i]);
        rest = &rest[i + marker.len()..];
    }
    parts.push(rest);
    parts
}

/// Decode a request into a data source.
///
/// `GET` and `DELETE` read only the query string. Otherwise the
/// `Content-Type` decides: multipart, URL-encoded (merged over the query)
/// or JSON. Anything else is [`Error::InvalidDataSource`].
pub fn from_request<B: AsRef<[u8]>>(req: &Request<B>) -> Result<Box<dyn DataSource>> {
    let query = req.uri().query().unwrap_or_default();

    if req.method() == Method::GET || req.method() == Method::DELETE {
        return Ok(Box::new(FormData::parse(query)?));
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let body = req.body().as_ref();

    tracing::debug!(method = %req.method(), content_type = %mime, "decoding request data");

    match mime.as_str() {
        "multipart/form-data" => {
            let parser = MultipartParser::from_content_type(content_type)?;
            Ok(Box::new(parser.parse(body)?))
        }
        "application/x-www-form-urlencoded" => {
            let mut form = FormData::parse(query)?;
            form.merge(FormData::parse_bytes(body)?);
            Ok(Box::new(form))
        }
        "application/json" => Ok(Box::new(MapData::from_json(body)?)),
        other => Err(Error::InvalidDataSource(format!(
            "unsupported content type '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

    fn multipart_body() -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nJohn\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
             Content-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
            b = BOUNDARY
        )
    }

    #[test]
    fn test_form_file_extension() {
        let file = FormFile::new(
            "document.PDF".to_string(),
            "application/pdf".to_string(),
            vec![1, 2, 3],
        );

        assert_eq!(file.extension().as_deref(), Some("pdf"));
        assert_eq!(file.size, 3);
    }

    #[test]
    fn test_form_file_is_image() {
        let image = FormFile::new("photo.bin".to_string(), "image/jpeg".to_string(), vec![]);
        assert!(image.is_image());

        let by_ext = FormFile::new("photo.png".to_string(), String::new(), vec![]);
        assert!(by_ext.is_image());

        let doc = FormFile::new("doc.pdf".to_string(), "application/pdf".to_string(), vec![]);
        assert!(!doc.is_image());
    }

    #[test]
    fn test_multipart_parser_from_content_type() {
        let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
        let parser = MultipartParser::from_content_type(&content_type).unwrap();

        assert_eq!(parser.boundary(), BOUNDARY);
    }

    #[test]
    fn test_multipart_parser_missing_boundary() {
        assert!(MultipartParser::from_content_type("multipart/form-data").is_err());
    }

    #[test]
    fn test_multipart_parse_fields_and_files() {
        let parser = MultipartParser::from_content_type(&format!(
            "multipart/form-data; boundary={}",
            BOUNDARY
        ))
        .unwrap();
        let form = parser.parse(multipart_body().as_bytes()).unwrap();

        assert_eq!(form.get("name"), Some(Value::from("John")));
        let avatar = &form.files().unwrap()["avatar"];
        assert_eq!(avatar.filename, "me.png");
        assert_eq!(avatar.content_type, "image/png");
        assert_eq!(avatar.data, b"PNGDATA");
    }

    #[test]
    fn test_multipart_keeps_binary_file_bytes() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0xFF, 0x00, 0x01];
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"a.png\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = BOUNDARY
        )
        .into_bytes();
        body.extend_from_slice(&png);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let parser = MultipartParser::from_content_type(&format!(
            "multipart/form-data; boundary={}",
            BOUNDARY
        ))
        .unwrap();
        let form = parser.parse(&body).unwrap();

        let photo = &form.files().unwrap()["photo"];
        assert_eq!(photo.data, png);
        assert_eq!(photo.size, 7);
    }

    #[test]
    fn test_from_request_get_uses_query() {
        let req = Request::get("/users?name=tom&age=20")
            .body(Vec::new())
            .unwrap();
        let data = from_request(&req).unwrap();

        assert_eq!(data.get("name"), Some(Value::from("tom")));
        assert_eq!(data.get("age"), Some(Value::from("20")));
    }

    #[test]
    fn test_from_request_urlencoded_merges_query() {
        let req = Request::post("/users?name=query&page=2")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(b"name=body".to_vec())
            .unwrap();
        let data = from_request(&req).unwrap();

        assert_eq!(data.get("name"), Some(Value::from("body")));
        assert_eq!(data.get("page"), Some(Value::from("2")));
    }

    #[test]
    fn test_from_request_json() {
        let req = Request::post("/users")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(br#"{"age": 45}"#.to_vec())
            .unwrap();
        let data = from_request(&req).unwrap();

        assert_eq!(data.get("age"), Some(Value::Int(45)));
    }

    #[test]
    fn test_from_request_multipart() {
        let req = Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(multipart_body().into_bytes())
            .unwrap();
        let data = from_request(&req).unwrap();

        assert!(data.files().unwrap().contains_key("avatar"));
    }

    #[test]
    fn test_from_request_unsupported_type() {
        let req = Request::post("/users")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(b"hello".to_vec())
            .unwrap();

        assert!(matches!(from_request(&req), Err(Error::InvalidDataSource(_))));
    }
}
