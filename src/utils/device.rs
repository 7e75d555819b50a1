// ============================================================================
// DEVICE - Detección de entorno a partir del user agent
// ============================================================================

const MOBILE_MARKERS: &[&str] = &[
    "android", "webos", "iphone", "ipad", "ipod", "blackberry", "iemobile", "opera mini",
];

pub fn user_agent() -> String {
    web_sys::window()
        .and_then(|w| w.navigator().user_agent().ok())
        .unwrap_or_default()
}

/// Dentro de WeCom / WeChat
pub fn is_in_wecom_ua(ua: &str) -> bool {
    let ua = ua.to_lowercase();
    ua.contains("wxwork") || ua.contains("micromessenger")
}

pub fn is_mobile_ua(ua: &str) -> bool {
    let ua = ua.to_lowercase();
    MOBILE_MARKERS.iter().any(|m| ua.contains(m))
}

pub fn is_in_wecom() -> bool {
    is_in_wecom_ua(&user_agent())
}

pub fn is_mobile() -> bool {
    is_mobile_ua(&user_agent())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_wecom() {
        assert!(is_in_wecom_ua("Mozilla/5.0 (iPhone) wxwork/4.1.0 MicroMessenger/7.0.1"));
        assert!(is_in_wecom_ua("Mozilla/5.0 MicroMessenger/8.0"));
        assert!(!is_in_wecom_ua("Mozilla/5.0 (X11; Linux x86_64) Firefox/120.0"));
    }

    #[test]
    fn test_detects_mobile() {
        assert!(is_mobile_ua("Mozilla/5.0 (Linux; Android 13; Pixel 7)"));
        assert!(is_mobile_ua("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"));
        assert!(!is_mobile_ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"));
    }
}
