use std::sync::Arc;

use tokio::sync::watch;

use crate::errors::{EduCopyError, EduCopyResult};
use crate::executor::host::{NoticeKind, PageHost, PageUi};

/// Transient on-page acknowledgements, silenced while notifications are off.
#[derive(Clone)]
pub struct Notices {
    ui: Arc<dyn PageUi>,
    enabled: watch::Receiver<bool>,
}

impl Notices {
    pub fn new(ui: Arc<dyn PageUi>, enabled: watch::Receiver<bool>) -> Self {
        Self { ui, enabled }
    }

    pub fn enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    pub fn info(&self, message: &str) {
        if self.enabled() {
            self.ui.show_notice(NoticeKind::Info, message);
        }
    }

    /// Errors are still logged when the overlay is silenced.
    pub fn error(&self, message: &str) {
        if self.enabled() {
            self.ui.show_notice(NoticeKind::Error, message);
        } else {
            tracing::error!(message = %message, "error notice suppressed");
        }
    }
}

/// Performs the final delivery of result text into the page.
pub struct ActionExecutor {
    host: Arc<dyn PageHost>,
    notices: Notices,
}

impl ActionExecutor {
    pub fn new(host: Arc<dyn PageHost>, notices: Notices) -> Self {
        Self { host, notices }
    }

    pub async fn deliver_clipboard(&self, text: &str) -> EduCopyResult<()> {
        self.host.write_clipboard(text).await?;
        tracing::info!(len = text.len(), "result copied to clipboard");
        self.notices.info("Copied");
        Ok(())
    }

    /// Insert into the focused text-capable element at its caret.
    pub fn deliver_input(&self, text: &str) -> EduCopyResult<()> {
        let mut field = self
            .host
            .focused_field()
            .filter(|f| f.kind.accepts_text())
            .ok_or(EduCopyError::NoFocusTarget)?;
        field.insert_at_caret(text);
        self.host.commit_field(field)?;
        tracing::info!(len = text.len(), "result inserted into focused field");
        self.notices.info("Text inserted");
        Ok(())
    }
}
