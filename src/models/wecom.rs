use serde::{Deserialize, Serialize};

/// Respuesta de `POST /api/wechat/config` (campos en la raíz)
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeChatConfig {
    #[serde(default)]
    pub corp_id: Option<String>,
    pub timestamp: serde_json::Value,
    pub nonce_str: String,
    pub signature: String,
}

/// Firma para `ww.register` (`/api/wework-config-signature`)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeWorkSignature {
    pub timestamp: serde_json::Value,
    pub nonce_str: String,
    pub signature: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConfigRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub kind: Option<String>,
}

/// URL firmada: sin fragmento
pub fn signable_url(href: &str) -> String {
    href.split('#').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signable_url_drops_fragment() {
        assert_eq!(signable_url("https://kq.szu.edu.cn/index.html?code=x#top"), "https://kq.szu.edu.cn/index.html?code=x");
    }

    #[test]
    fn test_config_accepts_numeric_timestamp() {
        let cfg: WeChatConfig = serde_json::from_str(
            r#"{"corpId":"ww1","timestamp":1700000000,"nonceStr":"abc","signature":"sig"}"#,
        )
        .unwrap();
        assert_eq!(cfg.corp_id.as_deref(), Some("ww1"));
        assert_eq!(cfg.timestamp, serde_json::json!(1700000000));
    }
}
