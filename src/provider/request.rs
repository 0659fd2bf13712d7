use crate::Result;
use crate::metric::{WebMetric, WebMetricMethod};
use ohno::{IntoAppError, bail};
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Translate a web metric into an outbound request.
///
/// No I/O happens here. Headers are applied in declaration order with set
/// semantics, and a JSON body always forces `Content-Type: application/json`.
pub fn build_request(web: &WebMetric) -> Result<reqwest::Request> {
    let string_body = web.string_body();
    let json_body = web.json_body.as_ref();

    if string_body.is_some() && json_body.is_some() {
        bail!("use either body or jsonBody; both cannot exist for a web metric payload");
    }

    if (string_body.is_some() || json_body.is_some()) && web.method == WebMetricMethod::Get {
        bail!("body/jsonBody can only be used with POST or PUT web metric methods");
    }

    let body = match (string_body, json_body) {
        (Some(body), _) => Some(reqwest::Body::from(body.to_string())),
        (None, Some(json)) => Some(reqwest::Body::from(
            serde_json::to_vec(json).into_app_err("serializing jsonBody")?,
        )),
        (None, None) => None,
    };

    let url = reqwest::Url::parse(&web.url).into_app_err_with(|| format!("parsing web metric URL '{}'", web.url))?;

    let mut request = reqwest::Request::new(web.method.as_http(), url);
    *request.body_mut() = body;

    let headers = request.headers_mut();
    for header in &web.headers {
        let name = HeaderName::from_bytes(header.key.as_bytes())
            .into_app_err_with(|| format!("invalid header name '{}'", header.key))?;
        let value =
            HeaderValue::from_str(&header.value).into_app_err_with(|| format!("invalid value for header '{}'", header.key))?;
        let _ = headers.insert(name, value);
    }

    if json_body.is_some() {
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    }

    Ok(request)
}
