//! Request inspection helpers shared by the auth handlers.

use axum::http::{HeaderMap, Uri};

/// Client identifier used when no proxy header names one.
pub const UNKNOWN_CLIENT: &str = "unknown";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Client IP for login throttling, from the usual proxy headers.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> String {
    header(headers, "cf-connecting-ip")
        .or_else(|| header(headers, "x-real-ip"))
        .or_else(|| {
            header(headers, "x-forwarded-for")
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Whether cookies should carry the `Secure` attribute.
pub(crate) fn is_secure_request(headers: &HeaderMap, uri: &Uri) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }
    header(headers, "x-forwarded-proto")
        .and_then(|value| value.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// `Host` names the local machine (port ignored).
pub(crate) fn is_local_host(headers: &HeaderMap) -> bool {
    let Some(host) = header(headers, "host") else {
        return false;
    };
    let name = if host.starts_with('[') {
        host.split_once(']').map_or(host, |(name, _)| &name[1..])
    } else {
        host.split(':').next().unwrap_or(host)
    };
    matches!(
        name.to_ascii_lowercase().as_str(),
        "localhost" | "127.0.0.1" | "::1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn client_ip_prefers_cloudflare_then_real_ip_then_forwarded() {
        let all = headers(&[
            ("cf-connecting-ip", "1.1.1.1"),
            ("x-real-ip", "2.2.2.2"),
            ("x-forwarded-for", "3.3.3.3, 4.4.4.4"),
        ]);
        assert_eq!(extract_client_ip(&all), "1.1.1.1");

        let real = headers(&[("x-real-ip", "2.2.2.2"), ("x-forwarded-for", "3.3.3.3")]);
        assert_eq!(extract_client_ip(&real), "2.2.2.2");

        let forwarded = headers(&[("x-forwarded-for", " 3.3.3.3 , 4.4.4.4")]);
        assert_eq!(extract_client_ip(&forwarded), "3.3.3.3");

        assert_eq!(extract_client_ip(&HeaderMap::new()), UNKNOWN_CLIENT);
        assert_eq!(
            extract_client_ip(&headers(&[("x-forwarded-for", " , 9.9.9.9")])),
            UNKNOWN_CLIENT
        );
    }

    #[test]
    fn secure_detection() {
        let plain: Uri = "/api/login".parse().unwrap();
        assert!(!is_secure_request(&HeaderMap::new(), &plain));
        assert!(is_secure_request(
            &headers(&[("x-forwarded-proto", "HTTPS")]),
            &plain
        ));
        assert!(!is_secure_request(
            &headers(&[("x-forwarded-proto", "http")]),
            &plain
        ));
        let absolute: Uri = "https://example.com/api/login".parse().unwrap();
        assert!(is_secure_request(&HeaderMap::new(), &absolute));
    }

    #[test]
    fn local_host_detection() {
        for host in ["localhost", "localhost:8080", "127.0.0.1:3000", "[::1]:8080", "LOCALHOST"] {
            assert!(is_local_host(&headers(&[("host", host)])), "{host}");
        }
        for host in ["example.com", "127.0.0.2", "localhost.example.com"] {
            assert!(!is_local_host(&headers(&[("host", host)])), "{host}");
        }
        assert!(!is_local_host(&HeaderMap::new()));
    }
}
