pub const ENV_APP_TITLE: &str = "APP_TITLE";
pub const ENV_UNIT_NAME: &str = "UNIT_NAME";
pub const ENV_LOGIN_USERNAME: &str = "LOGIN_USERNAME";
pub const ENV_LOGIN_PASSWORD: &str = "LOGIN_PASSWORD";

pub const DEFAULT_APP_TITLE: &str =
    "ระบบบันทึกอุบัติการณ์ความคลาดเคลื่อนทางยา (Medication Error)";
const REPORTER_FALLBACK: &str = "unknown";

/// Deployment-level settings read from the environment. The login pair is a
/// single shared credential; the gate that uses it lives in the UI layer.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub unit_name: String,
    pub login: Option<LoginConfig>,
}

#[derive(Clone)]
pub struct LoginConfig {
    pub username: String,
    password: String,
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginConfig {
    /// Contract for the UI login gate: a single shared-credential
    /// comparison, nothing more. The gate itself lives in the UI layer,
    /// which calls this with the submitted pair.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Pure constructor; `lookup` stands in for the process environment.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let login = match (non_blank(ENV_LOGIN_USERNAME), non_blank(ENV_LOGIN_PASSWORD)) {
            (Some(username), Some(password)) => Some(LoginConfig { username, password }),
            _ => None,
        };

        AppConfig {
            title: non_blank(ENV_APP_TITLE).unwrap_or_else(|| DEFAULT_APP_TITLE.to_string()),
            unit_name: non_blank(ENV_UNIT_NAME).unwrap_or_default(),
            login,
        }
    }

    /// Reporter recorded on appended rows: the configured login user, or a
    /// fallback when no login is configured.
    pub fn reporter(&self) -> &str {
        self.login
            .as_ref()
            .map(|login| login.username.as_str())
            .unwrap_or(REPORTER_FALLBACK)
    }
}
