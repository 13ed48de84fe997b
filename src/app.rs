use adw::Application;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::api::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Session {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in(&self) -> bool {
        !self.base_url.is_empty() && self.token.is_some() && !self.account_id.is_empty()
    }

    // TOML is the current format; early builds wrote JSON, which is still
    // read once and converted.
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("crumbshare.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = directories::ProjectDirs::from("org", "crumbshare", "CrumbShare")?;
        Some(proj.config_dir().join("session.json"))
    }

    pub fn load() -> Self {
        if let Some(path) = Self::toml_path() {
            if let Ok(bytes) = fs::read(&path) {
                if let Ok(text) = String::from_utf8(bytes) {
                    if let Ok(session) = toml::from_str::<Session>(&text) {
                        return session;
                    }
                }
            }
        }

        if let Some(legacy) = Self::legacy_json_path() {
            if let Ok(bytes) = fs::read(&legacy) {
                if let Ok(session) = serde_json::from_slice::<Session>(&bytes) {
                    let _ = session.save();
                    return session;
                }
            }
        }

        Self::new()
    }

    pub fn save(&self) -> std::io::Result<()> {
        if let Some(path) = Self::toml_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let toml = toml::to_string_pretty(self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            fs::write(path, toml)
        } else {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "No config dir"))
        }
    }

    /// Forget the token but keep the server URL for the next login form.
    pub fn clear_login(&mut self) {
        self.token = None;
        self.account_id.clear();
        self.display_name.clear();
        self.role = None;
    }
}

pub fn build_ui(app: &Application) {
    let session = Session::load();
    if session.logged_in() {
        crate::ui::main_window::show_main_window(app);
    } else {
        crate::ui::login::show_login_window(app);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_is_logged_out() {
        assert!(!Session::new().logged_in());
    }

    #[test]
    fn session_round_trips_through_toml() {
        let session = Session {
            base_url: "https://crumbshare.example".into(),
            token: Some("tok".into()),
            account_id: "charity-3".into(),
            display_name: "Tafel Mitte".into(),
            role: Some(Role::Charity),
        };
        let text = toml::to_string_pretty(&session).expect("encode");
        let back: Session = toml::from_str(&text).expect("decode");
        assert!(back.logged_in());
        assert_eq!(back.account_id, "charity-3");
        assert_eq!(back.role, Some(Role::Charity));
    }

    #[test]
    fn clear_login_keeps_the_server() {
        let mut session = Session {
            base_url: "https://crumbshare.example".into(),
            token: Some("tok".into()),
            account_id: "bakery-1".into(),
            display_name: "Ofenfrisch".into(),
            role: Some(Role::Bakery),
        };
        session.clear_login();
        assert!(!session.logged_in());
        assert_eq!(session.base_url, "https://crumbshare.example");
    }
}
