//! User-facing dialogs
//!
//! The texts are built here; rendering goes through the [`Dialogs`] trait so the
//! update flow does not depend on a toolkit.

use crate::error::UpdateError;
use crate::github::Release;

/// Modal dialogs shown during a run. Every call blocks until the user answers.
pub trait Dialogs {
    /// Informational dialog with a single OK button.
    fn show_up_to_date(&self, current: &str);
    /// Yes/No question; `true` means the user wants the update.
    fn confirm_update(&self, current: &str, release: &Release) -> bool;
    fn show_complete(&self);
    fn show_error(&self, error: &UpdateError);
}

pub fn up_to_date_text(app_name: &str, current: &str) -> String {
    format!(
        "You are already using the latest version of {}\n\nInstalled version: {}",
        app_name, current
    )
}

pub fn update_available_text(current: &str, release: &Release) -> String {
    format!(
        "There is a new version available.\n\n\
         Current version: {}\n\
         Latest version: {}\n\n\
         Release notes: {}\n\n\
         Do you want to install the new version?",
        current, release.version, release.changelog_url
    )
}

pub fn complete_text() -> &'static str {
    "Update complete!"
}

pub fn error_text(error: &UpdateError) -> String {
    format!("{}\n\n{}\n\nPlease try again later.", error.title(), error)
}

// ============================================================================
// Native dialogs (requires "full" feature)
// ============================================================================

#[cfg(feature = "full")]
pub use native::NativeDialogs;

#[cfg(feature = "full")]
mod native {
    use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

    use super::*;
    use crate::logging::log_action;

    /// Dialogs rendered by the platform's message box.
    pub struct NativeDialogs {
        caption: String,
        app_name: String,
    }

    impl NativeDialogs {
        pub fn new(caption: impl Into<String>, app_name: impl Into<String>) -> Self {
            Self {
                caption: caption.into(),
                app_name: app_name.into(),
            }
        }

        fn dialog(&self, level: MessageLevel, text: String) -> MessageDialog {
            MessageDialog::new()
                .set_level(level)
                .set_title(self.caption.as_str())
                .set_description(text)
        }
    }

    impl Dialogs for NativeDialogs {
        fn show_up_to_date(&self, current: &str) {
            let _ = self.dialog(MessageLevel::Info, up_to_date_text(&self.app_name, current))
                .set_buttons(MessageButtons::Ok)
                .show();
        }

        fn confirm_update(&self, current: &str, release: &Release) -> bool {
            let result = self
                .dialog(MessageLevel::Info, update_available_text(current, release))
                .set_buttons(MessageButtons::YesNo)
                .show();
            let accepted = matches!(result, MessageDialogResult::Yes);
            log_action(&format!(
                "User {} update to {}",
                if accepted { "accepted" } else { "declined" },
                release.version
            ));
            accepted
        }

        fn show_complete(&self) {
            let _ = self.dialog(MessageLevel::Info, complete_text().to_string())
                .set_buttons(MessageButtons::Ok)
                .show();
        }

        fn show_error(&self, error: &UpdateError) {
            let _ = self.dialog(MessageLevel::Error, error_text(error))
                .set_buttons(MessageButtons::Ok)
                .show();
        }
    }
}
