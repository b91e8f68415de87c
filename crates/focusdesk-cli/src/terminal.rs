//! Terminal notification sink: window title plus bell.

use std::io::Write;

use focusdesk_core::notify::{Chime, NotificationSink, TimerStatus};
use focusdesk_core::NotifyError;

pub struct TerminalNotifier {
    bell: bool,
    title: bool,
}

impl TerminalNotifier {
    pub fn new(bell: bool, title: bool) -> Self {
        Self { bell, title }
    }
}

impl NotificationSink for TerminalNotifier {
    fn signal_completion(&self, chime: Option<&Chime>) -> Result<(), NotifyError> {
        let mut err = std::io::stderr().lock();
        if let (true, Some(chime)) = (self.bell, chime) {
            // One BEL per tone; terminals cannot pitch them.
            for _ in &chime.tones {
                err.write_all(b"\x07")?;
            }
        }
        writeln!(err, "focus session complete")?;
        err.flush()?;
        Ok(())
    }

    fn reflect_status(&self, status: &TimerStatus) {
        if !self.title {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\x1b]0;{}\x07", status.title());
        let _ = err.flush();
    }
}
