//! Progress reporting while parsing header files (feature `progress`).
//!
//! [`FileProgress`] is an `indicatif` bar over the discovered header files. It is `Sync`,
//! so parse workers tick it directly; the bar itself reports throughput and ETA.
use std::time::Duration;

use camino::Utf8Path;
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{bar:40.cyan/blue} {pos}/{len} header files | {per_sec} | ETA {eta_precise} | {msg}";

pub struct FileProgress {
    pb: ProgressBar,
}

impl FileProgress {
    pub fn new(total: usize) -> Self {
        FileProgress::with_bar(ProgressBar::new(total as u64))
    }

    fn with_bar(pb: ProgressBar) -> Self {
        // A template error only loses the styling.
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(200));
        FileProgress { pb }
    }

    /// Count `path` as parsed and show its name.
    pub fn tick(&self, path: &Utf8Path) {
        self.pb
            .set_message(path.file_name().unwrap_or_default().to_string());
        self.pb.inc(1);
    }

    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod progress_bar_test {
    use super::*;

    #[test]
    fn test_tick_counts_files() {
        let progress = FileProgress::with_bar(ProgressBar::hidden());
        progress.pb.set_length(3);
        progress.tick(Utf8Path::new("/sims/MODEL1/a_HEAD.FITS"));
        progress.tick(Utf8Path::new("/sims/MODEL1/b_HEAD.FITS"));

        assert_eq!(progress.pb.position(), 2);
        assert_eq!(progress.pb.message(), "b_HEAD.FITS");
        progress.finish();
    }
}
