//! The network fetcher interface (§6) and a host-keyed cookie jar (§6's
//! "Persisted state"). The real fetcher is external (§1); `isahc` backs
//! the one production implementation, matching the teacher's own choice
//! of HTTP client crate.

use std::collections::HashMap;
use std::sync::Mutex;

use url::Url;

use crate::error::NetworkError;

pub trait HttpClient {
    fn request(&self, url: &Url, referrer: Option<&Url>, payload: Option<&str>) -> Result<(HashMap<String, String>, String), NetworkError>;
}

/// `isahc`-backed client used outside of tests.
pub struct IsahcHttpClient;

impl HttpClient for IsahcHttpClient {
    fn request(&self, url: &Url, referrer: Option<&Url>, payload: Option<&str>) -> Result<(HashMap<String, String>, String), NetworkError> {
        let mut request = isahc::Request::builder().uri(url.as_str());
        if let Some(referrer) = referrer {
            request = request.header("Referer", referrer.as_str());
        }
        let response = if let Some(body) = payload {
            request = request.method("POST");
            isahc::send(request.body(body.to_owned()).unwrap()).map_err(|source| NetworkError::Fetch {
                url: url.to_string(),
                source,
            })?
        } else {
            isahc::send(request.body(()).unwrap()).map_err(|source| NetworkError::Fetch {
                url: url.to_string(),
                source,
            })?
        };
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_owned())))
            .collect();
        let body = isahc::ReadResponseExt::text(&mut { response }).unwrap_or_default();
        Ok((headers, body))
    }
}

/// Cookies keyed by host, as `spec.md`'s "Persisted state" names; no
/// expiry or path scoping since neither the spec nor the ambient stack
/// around it calls for them.
#[derive(Default)]
pub struct CookieJar {
    by_host: Mutex<HashMap<String, String>>,
}

impl CookieJar {
    pub fn set(&self, host: &str, cookie: String) {
        self.by_host.lock().unwrap().insert(host.to_owned(), cookie);
    }

    pub fn get(&self, host: &str) -> Option<String> {
        self.by_host.lock().unwrap().get(host).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_jar_is_keyed_by_host() {
        let jar = CookieJar::default();
        jar.set("example.com", "session=abc".to_owned());
        jar.set("other.com", "session=def".to_owned());
        assert_eq!(jar.get("example.com").as_deref(), Some("session=abc"));
        assert_eq!(jar.get("other.com").as_deref(), Some("session=def"));
        assert_eq!(jar.get("nope.com"), None);
    }
}
