//! Session connection states

use serde::Serialize;
use std::fmt;

/// Where the session is in the login → char select → map sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    ConnectingLogin,
    LoginOk,
    LoginError,
    ConnectingChar,
    CharSelect,
    ConnectingMap,
    InGame,
    ChangingMap,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::ConnectingLogin => "connecting_login",
            Self::LoginOk => "login_ok",
            Self::LoginError => "login_error",
            Self::ConnectingChar => "connecting_char",
            Self::CharSelect => "char_select",
            Self::ConnectingMap => "connecting_map",
            Self::InGame => "in_game",
            Self::ChangingMap => "changing_map",
        }
    }

    /// A map server connection is expected in this state
    pub fn on_map_server(&self) -> bool {
        matches!(self, Self::ConnectingMap | Self::InGame | Self::ChangingMap)
    }

    /// A new login may be started from this state
    pub fn can_login(&self) -> bool {
        matches!(self, Self::Disconnected | Self::LoginError)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
