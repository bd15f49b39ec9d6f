use axum::http::{header, HeaderMap, HeaderValue};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "donations.sid";

/// Signs and parses the session cookie: `<sid>.<base64url(hmac-sha256(secret, sid))>`.
#[derive(Clone)]
pub struct SessionCookies {
    secret: Vec<u8>,
    max_age_secs: i64,
    secure: bool,
}

impl SessionCookies {
    pub fn new(secret: &str, max_age_secs: i64, secure: bool) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            max_age_secs,
            secure,
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.secret).expect("hmac key of any size")
    }

    pub fn sign(&self, sid: &str) -> String {
        let mut mac = self.mac();
        mac.update(sid.as_bytes());
        let tag = mac.finalize().into_bytes();
        format!("{}.{}", sid, Base64UrlUnpadded::encode_string(&tag))
    }

    /// Returns the session id if the signature verifies.
    pub fn unsign(&self, value: &str) -> Option<String> {
        let (sid, tag) = value.rsplit_once('.')?;
        let tag = Base64UrlUnpadded::decode_vec(tag).ok()?;
        let mut mac = self.mac();
        mac.update(sid.as_bytes());
        match mac.verify_slice(&tag) {
            Ok(()) => Some(sid.to_string()),
            Err(_) => {
                warn!("session cookie with bad signature");
                None
            }
        }
    }

    /// Verified session id from the request's `Cookie` headers, if any.
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        let raw = cookie_value(headers, COOKIE_NAME)?;
        self.unsign(&raw)
    }

    pub fn set_cookie(&self, sid: &str) -> HeaderValue {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            COOKIE_NAME,
            self.sign(sid),
            self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        // sid is hex and the tag is base64url, both valid header bytes
        HeaderValue::from_str(&cookie).expect("cookie is ascii")
    }

    pub fn clear_cookie(&self) -> HeaderValue {
        if self.secure {
            HeaderValue::from_static("donations.sid=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0; Secure")
        } else {
            HeaderValue::from_static("donations.sid=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
        }
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookies() -> SessionCookies {
        SessionCookies::new("test-secret", 86_400, false)
    }

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn sign_then_unsign_returns_sid() {
        let c = cookies();
        let signed = c.sign("abc123");
        assert!(signed.starts_with("abc123."));
        assert_eq!(c.unsign(&signed).as_deref(), Some("abc123"));
    }

    #[test]
    fn unsign_rejects_tampered_value() {
        let c = cookies();
        let signed = c.sign("abc123");
        let forged = signed.replacen("abc123", "abc124", 1);
        assert_eq!(c.unsign(&forged), None);
        assert_eq!(c.unsign("abc123"), None);
        assert_eq!(c.unsign("abc123.not!base64"), None);
    }

    #[test]
    fn unsign_rejects_other_secret() {
        let signed = SessionCookies::new("other", 60, false).sign("abc123");
        assert_eq!(cookies().unsign(&signed), None);
    }

    #[test]
    fn session_id_found_among_other_cookies() {
        let c = cookies();
        let headers = headers_with(&format!("theme=dark; {}={}; lang=en", COOKIE_NAME, c.sign("s1")));
        assert_eq!(c.session_id(&headers).as_deref(), Some("s1"));
        assert_eq!(c.session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn set_cookie_attributes() {
        let v = SessionCookies::new("k", 3600, true).set_cookie("s1");
        let s = v.to_str().unwrap();
        assert!(s.starts_with("donations.sid=s1."));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("Max-Age=3600"));
        assert!(s.ends_with("; Secure"));

        let plain = cookies().set_cookie("s1");
        assert!(!plain.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let v = cookies().clear_cookie();
        assert!(v.to_str().unwrap().contains("Max-Age=0"));
    }
}
