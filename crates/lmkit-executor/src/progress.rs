use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use console::{Style, Term};
use lmkit_config::ProgressMode;

/// Batch size above which `auto` progress is drawn
pub const PROGRESS_THRESHOLD: usize = 20;

/// Single redrawn stderr line counting finished tasks
///
/// The line is terminated on [`Progress::finish`] or, for a batch that
/// bails out early, on drop.
pub(crate) struct Progress {
    term: Option<Term>,
    label: String,
    total: usize,
    finished: AtomicUsize,
    closed: AtomicBool,
}

impl Progress {
    pub(crate) fn new(mode: ProgressMode, label: impl Into<String>, total: usize) -> Self {
        let term = is_visible(mode, total).then(Term::stderr);
        let progress = Self {
            term,
            label: label.into(),
            total,
            finished: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        };
        progress.draw(0);
        progress
    }

    pub(crate) fn advance(&self) {
        let finished = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
        self.draw(finished);
    }

    pub(crate) fn finish(&self) {
        if self.closed.swap(true, Ordering::Relaxed) {
            return;
        }
        if let Some(term) = &self.term {
            let _ = term.write_line("");
        }
    }

    fn draw(&self, finished: usize) {
        let Some(term) = &self.term else {
            return;
        };
        let label = Style::new().cyan().apply_to(&self.label);
        let _ = term.clear_line();
        let _ = term.write_str(&format!("{label} {finished}/{}", self.total));
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish();
    }
}

pub(crate) const fn is_visible(mode: ProgressMode, total: usize) -> bool {
    match mode {
        ProgressMode::Always => true,
        ProgressMode::Never => false,
        ProgressMode::Auto => total > PROGRESS_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_only_past_threshold() {
        assert!(!is_visible(ProgressMode::Auto, PROGRESS_THRESHOLD));
        assert!(is_visible(ProgressMode::Auto, PROGRESS_THRESHOLD + 1));
        assert!(is_visible(ProgressMode::Always, 1));
        assert!(!is_visible(ProgressMode::Never, 1000));
    }

    #[test]
    fn hidden_progress_still_counts() {
        let progress = Progress::new(ProgressMode::Never, "m", 3);
        progress.advance();
        progress.advance();
        progress.finish();
        assert_eq!(progress.finished.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn finish_closes_the_line_once() {
        let progress = Progress::new(ProgressMode::Never, "m", 1);
        assert!(!progress.closed.load(Ordering::Relaxed));
        progress.finish();
        progress.finish();
        assert!(progress.closed.load(Ordering::Relaxed));
    }
}
