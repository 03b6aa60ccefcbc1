//! Mode-driven progress reporting across three output disciplines, plus an
//! `off` mode, with elapsed-time accounting in `normal` mode.

use std::io::Write;
use std::time::Instant;

/// Output discipline selected once at [`Progress::init`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum ProgressMode {
    /// No output at all.
    Off,
    /// One integer per line, emitted only on change.
    Numeric,
    /// `\r  N%` overwrite on a terminal, with an elapsed-time summary.
    Normal,
    /// A structured frame per update, for a supervising process.
    Framing,
}

/// A sink for `framing`-mode updates, so the wire format stays an external
/// collaborator rather than something this module hardcodes.
pub trait FrameWriter {
    fn write_progress_frame(&mut self, percent: i32);
}

/// Translates unit-count increments into the selected output discipline.
pub struct Progress<'w> {
    mode: ProgressMode,
    last_reported: i32,
    total_units: u64,
    current_units: u64,
    start_time: Option<Instant>,
    frame_writer: Option<&'w mut dyn FrameWriter>,
}

impl<'w> Progress<'w> {
    /// Initializes progress reporting for `total_units` units of work and
    /// immediately emits 0% so the operator gets feedback without latency.
    pub fn init(mode: ProgressMode, total_units: u64, frame_writer: Option<&'w mut dyn FrameWriter>) -> Self {
        let mut progress = Progress {
            mode,
            last_reported: -1,
            total_units,
            current_units: 0,
            start_time: None,
            frame_writer,
        };
        progress.output_progress(0);
        progress
    }

    fn percent(&self) -> i32 {
        if self.total_units == 0 {
            return 0;
        }
        let percent = (self.current_units * 100 / self.total_units) as i32;
        percent.min(99)
    }

    /// Adds `units` to the current count and reports, capping the displayed
    /// percent at 99 until [`Progress::complete`] is called.
    pub fn report(&mut self, units: u64) {
        if self.mode == ProgressMode::Normal && self.start_time.is_none() && self.total_units > 0 {
            self.start_time = Some(Instant::now());
        }

        self.current_units += units;
        assert!(self.current_units <= self.total_units, "progress overrun");

        let percent = self.percent();
        self.output_progress(percent);
    }

    /// Emits 100% and, in `normal` mode, the elapsed wall-clock time.
    pub fn complete(&mut self) {
        self.output_progress(100);

        if self.mode == ProgressMode::Normal {
            if let Some(start) = self.start_time {
                let elapsed = start.elapsed();
                println!("\nElapsed time: {}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis());
            }
        }
    }

    fn output_progress(&mut self, percent: i32) {
        if percent == self.last_reported {
            return;
        }
        self.last_reported = percent;

        match self.mode {
            ProgressMode::Numeric => println!("{percent}"),
            ProgressMode::Normal => {
                print!("\r{percent:3}%");
                let _ = std::io::stdout().flush();
            }
            ProgressMode::Framing => {
                if let Some(writer) = self.frame_writer.as_deref_mut() {
                    writer.write_progress_frame(percent);
                }
            }
            ProgressMode::Off => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingFrameWriter {
        frames: Vec<i32>,
    }

    impl FrameWriter for RecordingFrameWriter {
        fn write_progress_frame(&mut self, percent: i32) {
            self.frames.push(percent);
        }
    }

    #[test]
    fn prog1_normal_mode_emissions() {
        let mut progress = Progress::init(ProgressMode::Normal, 100, None);
        progress.report(50);
        progress.report(50);
        progress.complete();
        // init(0), report(50), report(100 -> clamped 99), complete(100):
        // all distinct, so every call emitted. We can't observe stdout
        // directly here, but last_reported tracks what was shown.
        assert_eq!(progress.last_reported, 100);
    }

    #[test]
    fn suppression_skips_repeated_percent() {
        let mut writer = RecordingFrameWriter::default();
        let mut progress = Progress::init(ProgressMode::Framing, 1000, Some(&mut writer));
        progress.report(1);
        progress.report(1);
        progress.report(1);
        progress.complete();
        drop(progress);
        // 0% at init, then unchanged at 0% for the three tiny reports
        // (1/1000 rounds to 0), then 100% at complete.
        assert_eq!(writer.frames, vec![0, 100]);
    }

    #[test]
    fn monotonic_and_capped_at_99_until_complete() {
        let mut writer = RecordingFrameWriter::default();
        let mut progress = Progress::init(ProgressMode::Framing, 10, Some(&mut writer));
        for _ in 0..10 {
            progress.report(1);
        }
        assert_eq!(*writer.frames.last().unwrap(), 99);
        progress.complete();
        assert_eq!(*writer.frames.last().unwrap(), 100);
    }

    #[test]
    fn zero_total_units_reports_zero_percent() {
        let mut writer = RecordingFrameWriter::default();
        let mut progress = Progress::init(ProgressMode::Framing, 0, Some(&mut writer));
        assert_eq!(writer.frames, vec![0]);
        progress.complete();
        assert_eq!(writer.frames, vec![0, 100]);
    }
}
