use crate::request::HttpResponse;

pub const HEADER_HANDLED_BY: &str = "X-Handled-By";
pub const HEADER_ERROR_TYPE: &str = "X-Error-Type";
pub const HEADER_RETRY_RECOMMENDED: &str = "X-Retry-Recommended";

/// One link in the classification chain: a status predicate plus the
/// enhancement applied when it matches.
struct Handler {
    name: &'static str,
    matches: fn(&HttpResponse) -> bool,
    apply: fn(&mut HttpResponse),
}

/// Ordered chain of status-code handlers.
///
/// Built once and reused for every classification; evaluation is a single
/// linear pass where the first matching handler fires and the chain stops.
/// A response no handler claims is returned untouched.
pub struct ResponseClassifier {
    handlers: Vec<Handler>,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseClassifier {
    pub fn new() -> Self {
        Self {
            handlers: vec![
                Handler {
                    name: "SuccessHandler",
                    matches: |r| r.status_code == 200,
                    apply: |_| {},
                },
                Handler {
                    name: "NotFoundHandler",
                    matches: |r| r.status_code == 404,
                    apply: apply_not_found,
                },
                Handler {
                    name: "BadGatewayHandler",
                    matches: |r| r.status_code == 502,
                    apply: apply_bad_gateway,
                },
                Handler {
                    name: "ServiceUnavailableHandler",
                    matches: |r| r.status_code == 503,
                    apply: apply_service_unavailable,
                },
            ],
        }
    }

    /// Runs a response through the chain. Exactly one handler fires, or none;
    /// `false` means the response passed through byte-identical.
    pub fn classify(&self, mut response: HttpResponse) -> (HttpResponse, bool) {
        for handler in &self.handlers {
            if (handler.matches)(&response) {
                (handler.apply)(&mut response);
                response
                    .headers
                    .insert(HEADER_HANDLED_BY.to_string(), handler.name.to_string());
                log::debug!("response handled by {}", handler.name);
                return (response, true);
            }
        }
        (response, false)
    }
}

fn apply_not_found(response: &mut HttpResponse) {
    if !response.body.contains("404") {
        response.body = not_found_page();
    }
    response
        .headers
        .insert(HEADER_ERROR_TYPE.to_string(), "Client Error".to_string());
}

fn apply_bad_gateway(response: &mut HttpResponse) {
    if !response.body.contains("502") {
        response.body = bad_gateway_page();
    }
    response
        .headers
        .insert(HEADER_ERROR_TYPE.to_string(), "Server Error".to_string());
    response
        .headers
        .insert(HEADER_RETRY_RECOMMENDED.to_string(), "true".to_string());
}

fn apply_service_unavailable(response: &mut HttpResponse) {
    // The fallback request path stores header names lowercased.
    let retry_after = response
        .headers
        .get("Retry-After")
        .or_else(|| response.headers.get("retry-after"))
        .cloned();

    if !response.body.contains("503") {
        response.body = service_unavailable_page(retry_after.as_deref());
    }
    response
        .headers
        .insert(HEADER_ERROR_TYPE.to_string(), "Server Error".to_string());
    response
        .headers
        .insert(HEADER_RETRY_RECOMMENDED.to_string(), "true".to_string());
}

fn not_found_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
    <title>404 - Not Found</title>
    <style>
        body { font-family: Arial; text-align: center; padding: 50px; }
        h1 { color: #e74c3c; }
    </style>
</head>
<body>
    <h1>404 - Page Not Found</h1>
    <p>The page you are looking for does not exist.</p>
</body>
</html>
"#
    .to_string()
}

fn bad_gateway_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
    <title>502 - Bad Gateway</title>
    <style>
        body { font-family: Arial; text-align: center; padding: 50px; }
        h1 { color: #f39c12; }
    </style>
</head>
<body>
    <h1>502 - Bad Gateway</h1>
    <p>The server received an invalid response. Please try again later.</p>
</body>
</html>
"#
    .to_string()
}

fn service_unavailable_page(retry_after: Option<&str>) -> String {
    let retry_message = match retry_after {
        Some(seconds) => format!("<p>Please try again in {} seconds.</p>", seconds),
        None => "<p>Please try again in a few moments.</p>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>503 - Service Unavailable</title>
    <style>
        body {{ font-family: Arial; text-align: center; padding: 50px; }}
        h1 {{ color: #e67e22; }}
    </style>
</head>
<body>
    <h1>503 - Service Unavailable</h1>
    <p>The server is temporarily unavailable.</p>
    {}
</body>
</html>
"#,
        retry_message
    )
}
