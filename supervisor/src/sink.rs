//! The live job log: one append-only file shared by every run in turn.
//!
//! Each line is stamped with the time, the supervisor's PID and a level, then written
//! and flushed under a single lock so concurrent writers never interleave partial lines.
//! The file rolls over at a fixed boundary and keeps a bounded number of backups next
//! to it; between runs it is truncated so each archived snapshot holds only one run.
//! Backups rolled while a run is still writing belong to that run: they are part of its
//! snapshot and are not pruned until the next truncate.

use chrono::{DateTime, Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::Level;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Never,
    /// Roll over at local midnight, backups suffixed `.YYYY-MM-DD`.
    Daily,
    /// Roll over before a write would push the file past this many bytes.
    MaxBytes(u64),
}

pub struct LogSink {
    path: PathBuf,
    rotation: Rotation,
    backups: usize,
    state: Mutex<SinkState>,
}

struct SinkState {
    file: File,
    period: NaiveDate,
    written: u64,
    /// Backups rolled since the last truncate, oldest first.
    rolled: Vec<PathBuf>,
}

impl LogSink {
    /// Open the sink at `path`, discarding whatever a previous session left there.
    pub fn open(path: impl Into<PathBuf>, rotation: Rotation, backups: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = open_empty(&path)?;
        Ok(Self {
            path,
            rotation,
            backups,
            state: Mutex::new(SinkState {
                file,
                period: Local::now().date_naive(),
                written: 0,
                rolled: Vec::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, level: Level, message: &str) -> io::Result<()> {
        self.record_at(Local::now(), level, message)
    }

    pub(crate) fn record_at(&self, now: DateTime<Local>, level: Level, message: &str) -> io::Result<()> {
        let line = format!(
            "{} | PID {:>7} | {:<5} | {}\n",
            now.format("%Y-%m-%d %H:%M:%S%.3f"),
            std::process::id(),
            level.as_str(),
            message.trim_end_matches(['\r', '\n']),
        );
        let mut state = self.lock();
        self.rotate_if_due(&mut state, now, line.len() as u64)?;
        state.file.write_all(line.as_bytes())?;
        state.file.flush()?;
        state.written += line.len() as u64;
        Ok(())
    }

    /// Empty the live file in place and release the backups of the run that just ended
    /// to the usual pruning.
    pub fn truncate(&self) -> io::Result<()> {
        let mut state = self.lock();
        state.file.set_len(0)?;
        state.written = 0;
        state.rolled.clear();
        self.prune_backups(&state)
    }

    /// Write everything logged since the last truncate to `dest`: the backups rolled in
    /// the meantime, then the live file. Returns the number of bytes written.
    pub fn snapshot_to(&self, dest: &Path) -> io::Result<u64> {
        let mut state = self.lock();
        state.file.flush()?;
        let mut out = File::create(dest)?;
        let mut copied = 0;
        for part in state.rolled.iter().chain([&self.path]) {
            copied += io::copy(&mut File::open(part)?, &mut out)?;
        }
        out.flush()?;
        Ok(copied)
    }

    /// The last `lines` lines of the live file.
    pub fn tail(&self, lines: usize) -> io::Result<Vec<String>> {
        let contents = {
            let mut state = self.lock();
            state.file.flush()?;
            fs::read(&self.path)?
        };
        let contents = String::from_utf8_lossy(&contents);
        let all: Vec<&str> = contents.lines().collect();
        let skip = all.len().saturating_sub(lines);
        Ok(all[skip..].iter().map(|line| line.to_string()).collect())
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // a panic mid-write leaves at worst a partial line, the file itself stays usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rotate_if_due(
        &self,
        state: &mut SinkState,
        now: DateTime<Local>,
        incoming: u64,
    ) -> io::Result<()> {
        let suffix = match self.rotation {
            Rotation::Daily if now.date_naive() != state.period => {
                state.period.format("%Y-%m-%d").to_string()
            }
            Rotation::MaxBytes(limit) if state.written > 0 && state.written + incoming > limit => {
                now.format("%Y-%m-%d_%H%M%S").to_string()
            }
            _ => return Ok(()),
        };
        state.file.flush()?;
        let backup = unused_backup_path(&self.path, &suffix);
        fs::rename(&self.path, &backup)?;
        state.file = open_empty(&self.path)?;
        state.period = now.date_naive();
        state.written = 0;
        state.rolled.push(backup);
        self.prune_backups(state)
    }

    /// Remove the oldest backups beyond the configured count, sparing those of the
    /// run in progress.
    fn prune_backups(&self, state: &SinkState) -> io::Result<()> {
        let mut backups = self.list_backups()?;
        // compared by name, the listing may spell the directory differently
        backups.retain(|backup| {
            !state
                .rolled
                .iter()
                .any(|rolled| rolled.file_name() == backup.file_name())
        });
        backups.sort();
        let keep = self.backups.saturating_sub(state.rolled.len());
        let excess = backups.len().saturating_sub(keep);
        for stale in &backups[..excess] {
            fs::remove_file(stale)?;
        }
        Ok(())
    }

    fn list_backups(&self) -> io::Result<Vec<PathBuf>> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let prefix = format!("{}.", file_name(&self.path));
        let mut backups = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                backups.push(entry.path());
            }
        }
        Ok(backups)
    }
}

fn open_empty(path: &Path) -> io::Result<File> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    file.set_len(0)?;
    Ok(file)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    path.with_file_name(format!("{}.{}", file_name(path), suffix))
}

/// `backup_path`, numbered when two rollovers land on the same suffix.
fn unused_backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut backup = backup_path(path, suffix);
    let mut n = 1;
    while backup.exists() {
        backup = backup_path(path, &format!("{suffix}.{n}"));
        n += 1;
    }
    backup
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn sink_in(dir: &tempfile::TempDir, rotation: Rotation) -> LogSink {
        LogSink::open(dir.path().join("inference.log"), rotation, 1).expect("open sink")
    }

    #[test]
    fn open_discards_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.log");
        fs::write(&path, "stale line\n").unwrap();
        let sink = LogSink::open(&path, Rotation::Never, 1).unwrap();
        assert!(sink.tail(10).unwrap().is_empty());
    }

    #[test]
    fn lines_carry_level_and_message() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir, Rotation::Never);
        sink.record(Level::WARN, "PID 42 Start.").unwrap();
        sink.record(Level::INFO, "frame 1/10\r\n").unwrap();

        let lines = sink.tail(10).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("| WARN  |"));
        assert!(lines[0].ends_with("| PID 42 Start."));
        assert!(lines[1].ends_with("| frame 1/10"));
    }

    #[test]
    fn tail_returns_last_lines_only() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir, Rotation::Never);
        for i in 0..20 {
            sink.record(Level::INFO, &format!("line {i}")).unwrap();
        }
        let lines = sink.tail(3).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("line 17"));
        assert!(lines[2].ends_with("line 19"));
    }

    #[test]
    fn truncate_then_snapshot_holds_only_new_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir, Rotation::Never);
        sink.record(Level::INFO, "old run").unwrap();
        sink.truncate().unwrap();
        sink.record(Level::INFO, "new run").unwrap();

        let dest = dir.path().join("copy.log");
        sink.snapshot_to(&dest).unwrap();
        let copied = fs::read_to_string(dest).unwrap();
        assert!(!copied.contains("old run"));
        assert_eq!(copied.lines().count(), 1);
        assert!(copied.contains("new run"));
    }

    #[test]
    fn daily_rotation_keeps_one_backup_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir, Rotation::Daily);
        let day_one = Local.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap();
        {
            let mut state = sink.lock();
            state.period = day_one.date_naive();
        }
        sink.record_at(day_one, Level::INFO, "day one").unwrap();
        sink.record_at(day_one + Duration::days(1), Level::INFO, "day two").unwrap();
        sink.truncate().unwrap();
        sink.record_at(day_one + Duration::days(2), Level::INFO, "day three").unwrap();

        let backups = sink.list_backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert!(file_name(&backups[0]).ends_with("2024-05-02"));
        // the day two file was emptied by the truncate before it rolled
        assert!(fs::read_to_string(&backups[0]).unwrap().is_empty());

        let live = sink.tail(10).unwrap();
        assert_eq!(live.len(), 1);
        assert!(live[0].ends_with("day three"));
    }

    #[test]
    fn snapshot_spans_rollovers_within_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir, Rotation::Daily);
        let before_midnight = Local.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap();
        {
            let mut state = sink.lock();
            state.period = before_midnight.date_naive();
        }
        sink.record_at(before_midnight, Level::WARN, "PID 1 Start.").unwrap();
        sink.record_at(before_midnight, Level::INFO, "frame 1/3").unwrap();
        sink.record_at(before_midnight + Duration::minutes(2), Level::INFO, "frame 2/3")
            .unwrap();
        sink.record_at(before_midnight + Duration::days(2), Level::INFO, "frame 3/3")
            .unwrap();
        // both rolled files belong to the run, the backup count does not apply yet
        assert_eq!(sink.list_backups().unwrap().len(), 2);

        let dest = dir.path().join("copy.log");
        sink.snapshot_to(&dest).unwrap();
        let copied = fs::read_to_string(&dest).unwrap();
        let messages: Vec<_> = copied
            .lines()
            .map(|line| line.rsplit(" | ").next().unwrap())
            .collect();
        assert_eq!(messages, ["PID 1 Start.", "frame 1/3", "frame 2/3", "frame 3/3"]);

        sink.truncate().unwrap();
        assert_eq!(sink.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn size_rotation_starts_a_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir, Rotation::MaxBytes(120));
        for i in 0..4 {
            sink.record(Level::INFO, &format!("a line long enough to matter {i}"))
                .unwrap();
        }
        assert!(fs::metadata(sink.path()).unwrap().len() <= 120);
        assert_eq!(sink.list_backups().unwrap().len(), 3);

        let dest = dir.path().join("copy.log");
        sink.snapshot_to(&dest).unwrap();
        let copied = fs::read_to_string(&dest).unwrap();
        assert_eq!(copied.lines().count(), 4);
        assert!(copied.lines().next().unwrap().ends_with("matter 0"));

        sink.truncate().unwrap();
        assert_eq!(sink.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_writers_never_split_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(sink_in(&dir, Rotation::Never));
        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        sink.record(Level::INFO, &format!("writer {writer} line {i}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        let lines = sink.tail(usize::MAX).unwrap();
        assert_eq!(lines.len(), 200);
        assert!(lines.iter().all(|line| line.contains("| writer ")));
    }
}
