//! The `ui` namespace - window, theme and login operations exposed to renderers.
//!
//! Operations are an explicit enumeration ([`UiOperation`]); typed callers
//! build a [`UiRequest`] instead of spelling names and positional arguments
//! by hand. [`register_ui_handlers`] walks the enumeration, so every variant
//! is guaranteed a handler.
//!
//! | Operation                          | Arguments        | Result  |
//! |------------------------------------|------------------|---------|
//! | `ui:handleThemeChange`             | `theme`          | null    |
//! | `ui:handleSidebarVisibilityChange` | `visible`        | null    |
//! | `ui:handleMinimizeApp`             |                  | null    |
//! | `ui:handleMaximizeApp`             |                  | null    |
//! | `ui:handleCloseApp`                |                  | null    |
//! | `ui:handleFinishLogin`             |                  | null    |
//! | `ui:getGoogleOauthCode`            |                  | string  |
//! | `ui:getBookmarkDataByLink`         | `link`           | any     |

pub mod handlers;

use std::fmt;

use serde_json::Value;

use crate::error::Result;
use crate::handler::{HandlerRegistry, RegistryBuilder};
use crate::host::ThemeSource;
use crate::operation::Args;

/// Namespace of every operation in this module.
pub const UI_NAMESPACE: &str = "ui";

/// Event emitted after the login popup finished.
pub const FINISH_LOGIN_EVENT: &str = "ui:onFinishLogin";

/// Bridge capability serving bookmark previews.
pub const BOOKMARK_DATA_CAPABILITY: &str =
    "com.blocksuite.bookmark-block.get-bookmark-data-by-link";

/// Operations of the `ui` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiOperation {
    /// Set the global theme source.
    ThemeChange,
    /// Show or hide native window buttons along with the sidebar (macOS).
    SidebarVisibilityChange,
    /// Minimize every window.
    MinimizeApp,
    /// Toggle maximize on every window.
    MaximizeApp,
    /// Quit the application.
    CloseApp,
    /// Close the login popup and notify renderers.
    FinishLogin,
    /// Retrieve a Google OAuth code.
    GetGoogleOauthCode,
    /// Fetch bookmark preview data through the plugin bridge.
    GetBookmarkDataByLink,
}

impl UiOperation {
    /// Every operation, in declaration order.
    pub const ALL: [UiOperation; 8] = [
        Self::ThemeChange,
        Self::SidebarVisibilityChange,
        Self::MinimizeApp,
        Self::MaximizeApp,
        Self::CloseApp,
        Self::FinishLogin,
        Self::GetGoogleOauthCode,
        Self::GetBookmarkDataByLink,
    ];

    /// Full `ui:verb` name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ThemeChange => "ui:handleThemeChange",
            Self::SidebarVisibilityChange => "ui:handleSidebarVisibilityChange",
            Self::MinimizeApp => "ui:handleMinimizeApp",
            Self::MaximizeApp => "ui:handleMaximizeApp",
            Self::CloseApp => "ui:handleCloseApp",
            Self::FinishLogin => "ui:handleFinishLogin",
            Self::GetGoogleOauthCode => "ui:getGoogleOauthCode",
            Self::GetBookmarkDataByLink => "ui:getBookmarkDataByLink",
        }
    }

    /// Verb without the namespace.
    pub fn verb(self) -> &'static str {
        &self.name()[UI_NAMESPACE.len() + 1..]
    }

    /// Look an operation up by its full name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for UiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `ui` invocation with its typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiRequest {
    /// `ui:handleThemeChange`
    ThemeChange {
        /// New theme source.
        theme: ThemeSource,
    },
    /// `ui:handleSidebarVisibilityChange`
    SidebarVisibilityChange {
        /// Whether the sidebar is now visible.
        visible: bool,
    },
    /// `ui:handleMinimizeApp`
    MinimizeApp,
    /// `ui:handleMaximizeApp`
    MaximizeApp,
    /// `ui:handleCloseApp`
    CloseApp,
    /// `ui:handleFinishLogin`
    FinishLogin,
    /// `ui:getGoogleOauthCode`
    GetGoogleOauthCode,
    /// `ui:getBookmarkDataByLink`
    GetBookmarkDataByLink {
        /// Link to preview.
        link: String,
    },
}

impl UiRequest {
    /// Operation this request invokes.
    pub fn operation(&self) -> UiOperation {
        match self {
            Self::ThemeChange { .. } => UiOperation::ThemeChange,
            Self::SidebarVisibilityChange { .. } => UiOperation::SidebarVisibilityChange,
            Self::MinimizeApp => UiOperation::MinimizeApp,
            Self::MaximizeApp => UiOperation::MaximizeApp,
            Self::CloseApp => UiOperation::CloseApp,
            Self::FinishLogin => UiOperation::FinishLogin,
            Self::GetGoogleOauthCode => UiOperation::GetGoogleOauthCode,
            Self::GetBookmarkDataByLink { .. } => UiOperation::GetBookmarkDataByLink,
        }
    }

    /// Positional arguments in the order the handler expects them.
    pub fn into_args(self) -> Args {
        match self {
            Self::ThemeChange { theme } => vec![Value::String(theme.as_str().to_string())],
            Self::SidebarVisibilityChange { visible } => vec![Value::Bool(visible)],
            Self::GetBookmarkDataByLink { link } => vec![Value::String(link)],
            Self::MinimizeApp
            | Self::MaximizeApp
            | Self::CloseApp
            | Self::FinishLogin
            | Self::GetGoogleOauthCode => Vec::new(),
        }
    }
}

/// Register every `ui` operation and the `ui:onFinishLogin` event.
///
/// # Errors
///
/// `DuplicateRegistration` if any `ui` name is already taken in `builder`.
pub fn register_ui_handlers(builder: &mut RegistryBuilder) -> Result<()> {
    for op in UiOperation::ALL {
        let name = op.name();
        match op {
            UiOperation::ThemeChange => builder.register(name, handlers::theme_change)?,
            UiOperation::SidebarVisibilityChange => {
                builder.register(name, handlers::sidebar_visibility_change)?
            }
            UiOperation::MinimizeApp => builder.register(name, handlers::minimize_app)?,
            UiOperation::MaximizeApp => builder.register(name, handlers::maximize_app)?,
            UiOperation::CloseApp => builder.register(name, handlers::close_app)?,
            UiOperation::FinishLogin => builder.register(name, handlers::finish_login)?,
            UiOperation::GetGoogleOauthCode => {
                builder.register(name, handlers::get_google_oauth_code)?
            }
            UiOperation::GetBookmarkDataByLink => {
                builder.register(name, handlers::get_bookmark_data_by_link)?
            }
        };
    }
    builder.declare_event(FINISH_LOGIN_EVENT)?;
    Ok(())
}

/// Registry holding exactly the `ui` namespace.
pub fn ui_registry() -> Result<HandlerRegistry> {
    let mut builder = RegistryBuilder::new();
    register_ui_handlers(&mut builder)?;
    Ok(builder.build())
}
