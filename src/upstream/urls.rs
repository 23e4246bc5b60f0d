use url::Url;

/// Join a REST endpoint path onto the configured upstream base URL.
pub fn endpoint_url(base_url: &str, path: &str) -> Result<String, String> {
    let mut parsed = Url::parse(base_url).map_err(|e| e.to_string())?;

    let normalized_base = parsed.path().trim_end_matches('/');
    let trimmed_path = path.trim_start_matches('/');

    let full_path = if normalized_base.is_empty() {
        format!("/{trimmed_path}")
    } else {
        format!("{normalized_base}/{trimmed_path}")
    };

    parsed.set_path(&full_path);
    parsed.set_query(None);

    Ok(parsed.to_string())
}

/// Build the long-polling transport URL.
///
/// `t` is the cache-busting millisecond timestamp sent on GETs; `sid` is the
/// transport session id, absent only for the handshake request.
pub fn transport_url(base_url: &str, t: Option<u64>, sid: Option<&str>) -> Result<String, String> {
    let mut parsed = Url::parse(base_url).map_err(|e| e.to_string())?;

    parsed.set_path("/socket.io/");
    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.append_pair("EIO", "4");
        pairs.append_pair("transport", "polling");
        if let Some(t) = t {
            pairs.append_pair("t", &t.to_string());
        }
        if let Some(sid) = sid {
            pairs.append_pair("sid", sid);
        }
    }

    Ok(parsed.to_string())
}
