use clipfeed_models::Platform;

use crate::Error;

/// Validates a submitted URL and infers its platform from the host
/// (§4.5). Rejects anything that isn't `http`/`https` with a non-empty
/// host before any row is written.
pub(crate) fn validate_url(input: &str) -> Result<(String, Platform), Error> {
    let parsed = url::Url::parse(input).map_err(|_| Error::InvalidUrl(input.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::InvalidUrl(input.to_string()));
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::InvalidUrl(input.to_string()))?;

    let platform = Platform::infer_from_host(host);
    Ok((parsed.to_string(), platform))
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_models::Platform;

    #[test]
    fn infers_youtube() {
        let (_, platform) = validate_url("https://www.youtube.com/watch?v=abc").unwrap();
        assert_eq!(platform, Platform::Youtube);
    }

    #[test]
    fn infers_tiktok_by_suffix() {
        let (_, platform) = validate_url("https://vm.tiktok.com/xyz").unwrap();
        assert_eq!(platform, Platform::Tiktok);
    }

    #[test]
    fn falls_back_to_direct() {
        let (_, platform) = validate_url("https://cdn.example.com/video.mp4").unwrap();
        assert_eq!(platform, Platform::Direct);
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(validate_url("ftp://example.com/file").is_err());
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(validate_url("not a url").is_err());
    }
}
