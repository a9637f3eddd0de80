//! Typed decode of the Commons `imageinfo` response.
//!
//! Expected shape:
//!
//! ```json
//! {"query": {"pages": {"12345": {"imageinfo": [
//!     {"thumburl": "https://upload.wikimedia.org/.../90px-I-90.svg.png",
//!      "thumbwidth": 90, "thumbheight": 64, "width": 600, "height": 600}
//! ]}}}}
//! ```
//!
//! Every deviation maps to `ShieldError::MalformedResponse`.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::ShieldError;
use crate::transport::HttpResponse;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: BTreeMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    thumburl: Option<String>,
    thumbwidth: Option<u32>,
    thumbheight: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Thumbnail location and the size the API reports for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailInfo {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Validates status and content type, then decodes the body.
pub fn parse_response(response: &HttpResponse) -> Result<ThumbnailInfo, ShieldError> {
    if !response.is_success() {
        return Err(ShieldError::Http(response.status));
    }
    if !response.is_json() {
        return Err(ShieldError::NotJson(response.content_type.clone()));
    }
    decode_metadata(&response.body)
}

/// Decodes `query.pages.<first>.imageinfo[0]` from a JSON body.
pub fn decode_metadata(body: &[u8]) -> Result<ThumbnailInfo, ShieldError> {
    let api: ApiResponse = serde_json::from_slice(body)
        .map_err(|e| ShieldError::MalformedResponse(format!("invalid JSON: {e}")))?;
    let query = api
        .query
        .ok_or_else(|| malformed("missing \"query\""))?;
    let (_, page) = query
        .pages
        .into_iter()
        .next()
        .ok_or_else(|| malformed("no pages"))?;
    let info = page
        .imageinfo
        .into_iter()
        .next()
        .ok_or_else(|| malformed("page has no imageinfo"))?;
    let url = info
        .thumburl
        .ok_or_else(|| malformed("imageinfo has no thumburl"))?;
    url::Url::parse(&url).map_err(|e| malformed(&format!("bad thumburl {url:?}: {e}")))?;

    Ok(ThumbnailInfo {
        url,
        width: info.thumbwidth.or(info.width),
        height: info.thumbheight.or(info.height),
    })
}

fn malformed(what: &str) -> ShieldError {
    ShieldError::MalformedResponse(what.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERSTATE_90: &str = r#"{
        "batchcomplete": "",
        "query": {
            "pages": {
                "1047236": {
                    "pageid": 1047236,
                    "ns": 6,
                    "title": "File:I-90.svg",
                    "imagerepository": "local",
                    "imageinfo": [{
                        "size": 2263,
                        "width": 600,
                        "height": 600,
                        "thumburl": "https://upload.wikimedia.org/wikipedia/commons/thumb/8/8b/I-90.svg/90px-I-90.svg.png",
                        "thumbwidth": 90,
                        "thumbheight": 64,
                        "url": "https://upload.wikimedia.org/wikipedia/commons/8/8b/I-90.svg"
                    }]
                }
            }
        }
    }"#;

    fn json_response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            content_type: Some("application/json; charset=utf-8".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn decodes_thumbnail_url_and_size() {
        let info = parse_response(&json_response(INTERSTATE_90)).unwrap();
        assert_eq!(
            info.url,
            "https://upload.wikimedia.org/wikipedia/commons/thumb/8/8b/I-90.svg/90px-I-90.svg.png"
        );
        assert_eq!(info.width, Some(90));
        assert_eq!(info.height, Some(64));
    }

    #[test]
    fn falls_back_to_original_size() {
        let body = r#"{"query":{"pages":{"1":{"imageinfo":[
            {"thumburl":"https://example.org/t.png","width":20,"height":10}
        ]}}}}"#;
        let info = decode_metadata(body.as_bytes()).unwrap();
        assert_eq!((info.width, info.height), (Some(20), Some(10)));
    }

    #[test]
    fn missing_file_is_malformed() {
        let body = r#"{"query":{"pages":{"-1":{"ns":6,"title":"File:Nope.svg","missing":""}}}}"#;
        let err = decode_metadata(body.as_bytes()).unwrap_err();
        assert!(matches!(err, ShieldError::MalformedResponse(_)), "{err}");
    }

    #[test]
    fn shape_deviations_are_malformed() {
        for body in [
            "",
            "not json",
            "[]",
            "{}",
            r#"{"query":{}}"#,
            r#"{"query":{"pages":{}}}"#,
            r#"{"query":{"pages":{"1":{"imageinfo":[]}}}}"#,
            r#"{"query":{"pages":{"1":{"imageinfo":[{"url":"https://example.org/a.svg"}]}}}}"#,
            r#"{"query":{"pages":{"1":{"imageinfo":[{"thumburl":42}]}}}}"#,
            r#"{"query":{"pages":{"1":{"imageinfo":[{"thumburl":"not a url"}]}}}}"#,
        ] {
            let err = decode_metadata(body.as_bytes()).unwrap_err();
            assert!(
                matches!(err, ShieldError::MalformedResponse(_)),
                "body {body:?} gave {err}"
            );
        }
    }

    #[test]
    fn non_json_content_type_rejected() {
        let mut response = json_response(INTERSTATE_90);
        response.content_type = Some("text/html".to_string());
        assert!(matches!(
            parse_response(&response),
            Err(ShieldError::NotJson(Some(_)))
        ));
        response.content_type = None;
        assert!(matches!(
            parse_response(&response),
            Err(ShieldError::NotJson(None))
        ));
    }

    #[test]
    fn error_status_rejected() {
        let mut response = json_response(INTERSTATE_90);
        response.status = 503;
        assert!(matches!(parse_response(&response), Err(ShieldError::Http(503))));
    }
}
