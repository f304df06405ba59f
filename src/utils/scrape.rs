use anyhow::Result;
use tracing::debug;

/// Fetch `url` and return the raw response body
///
/// Without `params` this is a GET. With `params` they are sent as a
/// form-encoded POST body.
pub fn scrape(
    url: &str,
    params: Option<&[(&str, &str)]>,
    user_agent: Option<&str>,
) -> Result<Vec<u8>> {
    let mut response = match params {
        Some(params) => {
            debug!("POST {} ({} params)", url, params.len());
            let mut request = ureq::post(url);
            if let Some(agent) = user_agent {
                request = request.header("User-Agent", agent);
            }
            request.send_form(params.iter().copied())?
        }
        None => {
            debug!("GET {}", url);
            let mut request = ureq::get(url);
            if let Some(agent) = user_agent {
                request = request.header("User-Agent", agent);
            }
            request.call()?
        }
    };

    Ok(response.body_mut().read_to_vec()?)
}
