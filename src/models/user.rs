use serde::{Deserialize, Serialize};

/// Identidad del usuario firmado
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct UserInfo {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub wechat_userid: String,
    #[serde(default)]
    pub department: String,
}

impl UserInfo {
    /// Campos obligatorios presentes
    pub fn is_complete(&self) -> bool {
        !self.student_id.trim().is_empty() && !self.name.trim().is_empty()
    }
}

// ---- CAS ----

#[derive(Clone, Debug, Deserialize)]
pub struct CasUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub org_dn: Option<String>,
}

impl From<CasUser> for UserInfo {
    fn from(user: CasUser) -> Self {
        let student_id = if user.username.is_empty() {
            user.student_id.unwrap_or_default()
        } else {
            user.username.clone()
        };
        UserInfo {
            student_id,
            name: user.name,
            wechat_userid: user.username,
            department: user.org_dn.unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CasStatus {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub user: Option<CasUser>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CasLogin {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub login_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_completeness() {
        let mut user = UserInfo {
            student_id: "2021150001".into(),
            name: "李华".into(),
            ..Default::default()
        };
        assert!(user.is_complete());
        user.name = "  ".into();
        assert!(!user.is_complete());
    }

    #[test]
    fn test_cas_user_mapping() {
        let cas: CasUser = serde_json::from_str(
            r#"{"username":"2021150001","name":"李华","org_dn":"计算机与软件学院"}"#,
        )
        .unwrap();
        let user = UserInfo::from(cas);
        assert_eq!(user.student_id, "2021150001");
        assert_eq!(user.wechat_userid, "2021150001");
        assert_eq!(user.department, "计算机与软件学院");
    }

    #[test]
    fn test_cas_status_ignores_envelope_flag() {
        let status: CasStatus = serde_json::from_str(
            r#"{"success":true,"logged_in":true,"user":{"username":"2021150001","name":"李华"}}"#,
        )
        .unwrap();
        assert!(status.logged_in);
        assert_eq!(status.user.map(|u| u.username).as_deref(), Some("2021150001"));
    }
}
