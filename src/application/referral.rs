use chrono::{DateTime, Utc};
use url::Url;

const EMAIL_PREFIX_LEN: usize = 5;
pub const MAX_REFERRAL_CODE_LEN: usize = 10;

/// Time source for referral codes, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// `<up to 5 chars of the local part>_<base36 millis>`, cut to 10 chars.
///
/// Not unique by construction: two signups sharing a prefix within the same
/// coarse time bucket collide.
pub fn derive_referral_code(email: &str, at: DateTime<Utc>) -> String {
    let local = email.split_once('@').map(|(local, _)| local).unwrap_or(email);
    let prefix: String = local.chars().take(EMAIL_PREFIX_LEN).collect();
    let token = to_base36(at.timestamp_millis().max(0) as u64);

    format!("{prefix}_{token}")
        .chars()
        .take(MAX_REFERRAL_CODE_LEN)
        .collect()
}

/// `<origin>/?ref=<code>`, the link people pass around to join.
pub fn share_url(app_origin: &Url, referral_code: &str) -> Url {
    let mut url = app_origin.clone();
    url.set_path("/");
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair("ref", referral_code);
    url
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
