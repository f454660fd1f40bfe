//! Deep link composition for the employee check-in view

/// Builds the deep link an employee's scan should open.
///
/// Pure and deterministic: identical inputs always produce byte-identical
/// output, so the display loop can compare tokens rather than link strings.
/// An empty `base_url` yields a relative link (`/?...`) so the same view can
/// be opened standalone.
pub fn compose_link(base_url: &str, company_id: i64, token: &str) -> String {
    format!(
        "{}/?company_id={}&qr_token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&company_id.to_string()),
        urlencoding::encode(token),
    )
}
