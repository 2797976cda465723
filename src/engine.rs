use std::time::Instant;

use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::match_tracker::{self, CorrectionPolicy};
use crate::metrics;
use crate::runtime::{Clock, SystemClock};
use crate::sentence_bank::SentenceBank;
use crate::session::{Mode, SessionConfig, SessionState, Snapshot, TimeLimit};
use crate::stats::{RoundRecord, SentenceResult, StatsLog, TimedResult};

/// Counters for a timed run in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimedRun {
    limit: TimeLimit,
    remaining: u64,
    chars: usize,
    sentences: u32,
}

impl TimedRun {
    fn new(limit: TimeLimit) -> Self {
        Self {
            limit,
            remaining: limit.secs(),
            chars: 0,
            sentences: 0,
        }
    }
}

/// Drives rounds: owns the target, the input buffer, the clock and the
/// history, and reacts to input, tick and control events one at a time.
///
/// Events that arrive in a state that does not expect them are dropped
/// without error.
#[derive(Debug)]
pub struct SessionEngine<C: Clock = SystemClock> {
    bank: SentenceBank,
    log: StatsLog,
    config: SessionConfig,
    clock: C,
    rng: StdRng,
    state: SessionState,
    target: String,
    buffer: String,
    correct_chars: usize,
    progress_percent: f64,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    round: u32,
    timed: Option<TimedRun>,
    ticking: bool,
    last_record: Option<RoundRecord>,
}

impl SessionEngine<SystemClock> {
    pub fn new(bank: SentenceBank, log: StatsLog, config: SessionConfig) -> Self {
        Self::with_clock(bank, log, config, SystemClock)
    }
}

impl<C: Clock> SessionEngine<C> {
    pub fn with_clock(bank: SentenceBank, log: StatsLog, config: SessionConfig, clock: C) -> Self {
        Self {
            bank,
            log,
            config,
            clock,
            rng: StdRng::from_entropy(),
            state: SessionState::Idle,
            target: String::new(),
            buffer: String::new(),
            correct_chars: 0,
            progress_percent: 0.0,
            started_at: None,
            finished_at: None,
            round: 1,
            timed: None,
            ticking: false,
            last_record: None,
        }
    }

    /// Makes sentence selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn bank(&self) -> &SentenceBank {
        &self.bank
    }

    pub fn log(&self) -> &StatsLog {
        &self.log
    }

    /// Index the next completed round will carry.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn last_record(&self) -> Option<&RoundRecord> {
        self.last_record.as_ref()
    }

    /// Whether the timed-mode tick source should be running.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Shows a fresh target: Idle or Completed to Armed.
    pub fn start_round(&mut self) -> bool {
        match self.state {
            SessionState::Idle | SessionState::Completed => {
                self.arm();
                true
            }
            state => {
                debug!(%state, "start_round ignored");
                false
            }
        }
    }

    /// Explicit start signal: Armed to Active. Timed runs can only begin here.
    pub fn ready(&mut self) -> bool {
        if self.state != SessionState::Armed {
            debug!(state = %self.state, "ready ignored");
            return false;
        }
        self.begin();
        true
    }

    /// Live surface: the whole current input text after a keystroke.
    ///
    /// Returns the record when this keystroke finished a round.
    pub fn input_changed(&mut self, text: &str) -> Option<RoundRecord> {
        match (self.state, self.config.mode) {
            (SessionState::Armed, Mode::Sentence) => self.begin(),
            (SessionState::Active, _) => {}
            (state, mode) => {
                debug!(%state, %mode, "input ignored");
                return None;
            }
        }

        let eval = match_tracker::evaluate(&self.target, text, self.config.correction);
        self.buffer = eval.accepted.clone();
        self.correct_chars = eval.correct_chars;
        self.progress_percent = eval.progress_percent;

        if !eval.completed {
            return None;
        }

        match self.config.mode {
            Mode::Sentence => {
                let accuracy = self
                    .config
                    .correction
                    .tracks_accuracy()
                    .then_some(eval.correct_chars);
                Some(self.finish_sentence(eval.accepted_len(), accuracy))
            }
            Mode::Timed => {
                self.next_timed_sentence();
                None
            }
        }
    }

    /// Sequential surface: one submitted line ends the round, right or wrong.
    ///
    /// The line is always graded non-destructively. In timed mode a line is
    /// treated like live input.
    pub fn submit_line(&mut self, line: &str) -> Option<RoundRecord> {
        if self.config.mode == Mode::Timed {
            return self.input_changed(line);
        }

        match self.state {
            SessionState::Armed => self.begin(),
            SessionState::Active => {}
            state => {
                debug!(%state, "line ignored");
                return None;
            }
        }

        let line = line.trim_end_matches(['\r', '\n']);
        let eval = match_tracker::evaluate(&self.target, line, CorrectionPolicy::Permissive);
        self.buffer = eval.accepted;
        self.correct_chars = eval.correct_chars;
        self.progress_percent = eval.progress_percent;

        Some(self.finish_sentence(line.chars().count(), Some(eval.correct_chars)))
    }

    /// One-second tick from the timed-mode tick source.
    ///
    /// Returns the record when this tick ended the run.
    pub fn tick(&mut self) -> Option<RoundRecord> {
        if !self.ticking || self.state != SessionState::Active {
            debug!(state = %self.state, "stale tick ignored");
            return None;
        }
        let run = self.timed.as_mut()?;
        run.remaining = run.remaining.saturating_sub(1);
        if run.remaining > 0 {
            return None;
        }
        Some(self.finish_timed())
    }

    /// Takes effect immediately unless a run is in progress, in which case
    /// the new limit applies from the next run.
    pub fn set_time_limit(&mut self, secs: u64) -> Result<(), ConfigError> {
        let limit = TimeLimit::from_secs(secs)?;
        self.config.time_limit = limit;
        if self.state != SessionState::Active {
            if let Some(run) = self.timed.as_mut() {
                *run = TimedRun::new(limit);
            }
        }
        debug!(secs, state = %self.state, "time limit set");
        Ok(())
    }

    /// Switches between sentence and timed mode. Refused while a round is
    /// active; otherwise the tick source is stopped and the new mode armed.
    pub fn switch_mode(&mut self, mode: Mode) -> bool {
        if self.state == SessionState::Active {
            debug!(from = %self.config.mode, to = %mode, "mode switch refused while active");
            return false;
        }
        self.ticking = false;
        self.buffer.clear();
        self.config.mode = mode;
        self.arm();
        info!(%mode, "mode switched");
        true
    }

    pub fn snapshot(&self) -> Snapshot {
        let elapsed_secs = self.elapsed_secs();
        let buffered = self.buffer.chars().count();
        let chars = buffered + self.timed.map_or(0, |run| run.chars);
        let target_len = self.target.chars().count();

        let (wpm, cps, accuracy_percent) = match (&self.state, &self.last_record) {
            (SessionState::Completed, Some(RoundRecord::Sentence(r))) => {
                (r.wpm, r.cps, r.accuracy)
            }
            _ => (
                metrics::wpm(chars, elapsed_secs),
                metrics::cps(chars, elapsed_secs),
                self.config
                    .correction
                    .tracks_accuracy()
                    .then(|| live_accuracy(self.correct_chars, target_len, elapsed_secs)),
            ),
        };

        Snapshot {
            state: self.state,
            mode: self.config.mode,
            correction: self.config.correction,
            round: self.round,
            target: self.target.clone(),
            buffer: self.buffer.clone(),
            progress_percent: self.progress_percent,
            elapsed_secs,
            wpm,
            cps,
            accuracy_percent,
            remaining_secs: self.timed.map(|run| run.remaining),
            sentences_completed: self.timed.map(|run| run.sentences),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start).as_secs_f64(),
            (Some(start), None) => self.clock.now().duration_since(start).as_secs_f64(),
            _ => 0.0,
        }
    }

    fn pick_target(&mut self) -> String {
        self.bank.pick_with(&mut self.rng).to_string()
    }

    fn clear_input(&mut self) {
        self.buffer.clear();
        self.correct_chars = 0;
        self.progress_percent = 0.0;
    }

    fn arm(&mut self) {
        self.ticking = false;
        self.target = self.pick_target();
        self.clear_input();
        self.started_at = None;
        self.finished_at = None;
        self.timed = match self.config.mode {
            Mode::Sentence => None,
            Mode::Timed => Some(TimedRun::new(self.config.time_limit)),
        };
        self.state = SessionState::Armed;
        debug!(mode = %self.config.mode, round = self.round, target = %self.target, "armed");
    }

    fn begin(&mut self) {
        self.started_at = Some(self.clock.now());
        self.finished_at = None;
        if self.config.mode == Mode::Timed {
            self.timed = Some(TimedRun::new(self.config.time_limit));
            self.ticking = true;
        }
        self.state = SessionState::Active;
        debug!(mode = %self.config.mode, round = self.round, "started");
    }

    fn next_timed_sentence(&mut self) {
        let done = self.target.chars().count();
        if let Some(run) = self.timed.as_mut() {
            run.chars += done;
            run.sentences += 1;
            debug!(chars = run.chars, sentences = run.sentences, "sentence folded into run");
        }
        self.target = self.pick_target();
        self.clear_input();
    }

    fn finish_sentence(&mut self, chars: usize, correct_chars: Option<usize>) -> RoundRecord {
        self.finished_at = Some(self.clock.now());
        self.state = SessionState::Completed;

        let elapsed_secs = self.elapsed_secs();
        let target_len = self.target.chars().count();
        let record = RoundRecord::Sentence(SentenceResult {
            round: self.round,
            timestamp: Local::now(),
            target: self.target.clone(),
            elapsed_secs,
            wpm: metrics::wpm(chars, elapsed_secs),
            cps: metrics::cps(chars, elapsed_secs),
            accuracy: correct_chars.map(|c| live_accuracy(c, target_len, elapsed_secs)),
        });
        self.complete(record)
    }

    fn finish_timed(&mut self) -> RoundRecord {
        self.ticking = false;
        self.finished_at = Some(self.clock.now());
        self.state = SessionState::Completed;

        let run = self.timed.unwrap_or_else(|| TimedRun::new(self.config.time_limit));
        let duration = run.limit.secs() as f64;
        let record = RoundRecord::Timed(TimedResult {
            round: self.round,
            timestamp: Local::now(),
            duration_secs: run.limit.secs(),
            wpm: metrics::wpm(run.chars, duration),
            cps: metrics::cps(run.chars, duration),
            chars: run.chars,
            words: metrics::words(run.chars),
            sentences: run.sentences,
        });
        let record = self.complete(record);

        // a finished run is immediately replaced by a fresh one awaiting `ready`
        self.arm();
        record
    }

    fn complete(&mut self, record: RoundRecord) -> RoundRecord {
        info!(
            round = record.round(),
            wpm = record.wpm(),
            cps = record.cps(),
            accuracy = ?record.accuracy(),
            "round completed"
        );
        self.log.record(record.clone());
        self.last_record = Some(record.clone());
        self.round += 1;
        record
    }
}

fn live_accuracy(correct_chars: usize, target_len: usize, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    metrics::accuracy(correct_chars, target_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualClock;
    use assert_matches::assert_matches;

    fn engine_with(
        sentences: &[&str],
        mode: Mode,
        correction: CorrectionPolicy,
    ) -> (SessionEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let bank = SentenceBank::new("test", sentences.iter().copied()).unwrap();
        let config = SessionConfig {
            mode,
            correction,
            time_limit: TimeLimit::from_secs(15).unwrap(),
        };
        let engine = SessionEngine::with_clock(bank, StatsLog::new(), config, clock.clone());
        (engine, clock)
    }

    fn strict(sentences: &[&str]) -> (SessionEngine<ManualClock>, ManualClock) {
        engine_with(sentences, Mode::Sentence, CorrectionPolicy::StrictPrefix)
    }

    #[test]
    fn starts_idle_with_nothing_shown() {
        let (engine, _) = strict(&["cat"]);
        let snap = engine.snapshot();
        assert_eq!(snap.state, SessionState::Idle);
        assert_eq!(snap.target, "");
        assert_eq!(snap.wpm, 0.0);
        assert_eq!(snap.round, 1);
    }

    #[test]
    fn start_round_arms_with_a_target() {
        let (mut engine, _) = strict(&["cat"]);
        assert!(engine.start_round());
        assert_eq!(engine.state(), SessionState::Armed);
        assert_eq!(engine.target(), "cat");
        assert!(!engine.start_round(), "already armed");
    }

    #[test]
    fn first_keystroke_starts_the_clock() {
        let (mut engine, clock) = strict(&["cat"]);
        engine.start_round();
        clock.advance_secs(5.0);
        assert_eq!(engine.snapshot().elapsed_secs, 0.0);

        engine.input_changed("c");
        assert_eq!(engine.state(), SessionState::Active);
        clock.advance_secs(2.0);
        assert_eq!(engine.snapshot().elapsed_secs, 2.0);
    }

    #[test]
    fn strict_input_is_truncated_at_first_error() {
        let (mut engine, _) = strict(&["cat"]);
        engine.start_round();
        assert_eq!(engine.input_changed("cag"), None);
        assert_eq!(engine.buffer(), "ca");
        assert_eq!(engine.snapshot().accuracy_percent, None);
    }

    #[test]
    fn completing_the_target_records_the_round() {
        let (mut engine, clock) = strict(&["cat"]);
        engine.start_round();
        engine.input_changed("c");
        clock.advance_secs(3.0);
        let record = engine.input_changed("cat").unwrap();

        assert_eq!(engine.state(), SessionState::Completed);
        assert_matches!(
            &record,
            RoundRecord::Sentence(SentenceResult { round: 1, accuracy: None, .. })
        );
        assert_eq!(record.cps(), 1.0);
        assert_eq!(record.wpm(), 12.0);
        assert_eq!(engine.log().recent(1), &[record]);
        assert_eq!(engine.round(), 2);
    }

    #[test]
    fn completed_round_locks_input() {
        let (mut engine, _) = strict(&["cat"]);
        engine.start_round();
        engine.input_changed("cat");
        assert_eq!(engine.input_changed("c"), None);
        assert_eq!(engine.buffer(), "cat");
        assert_eq!(engine.log().len(), 1);
    }

    #[test]
    fn round_index_increases_by_one() {
        let (mut engine, clock) = strict(&["ab"]);
        for expected in 1..=3 {
            engine.start_round();
            engine.input_changed("a");
            clock.advance_secs(1.0);
            let rec = engine.input_changed("ab").unwrap();
            assert_eq!(rec.round(), expected);
        }
        let rounds: Vec<u32> = engine.log().records().iter().map(RoundRecord::round).collect();
        assert_eq!(rounds, vec![1, 2, 3]);
    }

    #[test]
    fn permissive_tracks_accuracy_live() {
        let (mut engine, clock) = engine_with(&["cat"], Mode::Sentence, CorrectionPolicy::Permissive);
        engine.start_round();
        engine.input_changed("c");
        assert_eq!(engine.snapshot().accuracy_percent, Some(0.0), "no time has passed");
        clock.advance_secs(1.0);
        engine.input_changed("cb");
        let snap = engine.snapshot();
        assert_eq!(snap.buffer, "cb");
        let acc = snap.accuracy_percent.unwrap();
        assert!((acc - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn submit_line_grades_the_whole_line() {
        let (mut engine, clock) = strict(&["cat"]);
        engine.start_round();
        assert!(engine.ready());
        clock.advance_secs(2.0);
        let rec = engine.submit_line("cbt\n").unwrap();

        let acc = rec.accuracy().unwrap();
        assert!((acc - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(rec.wpm(), metrics::wpm(3, 2.0));
        assert_eq!(engine.state(), SessionState::Completed);
    }

    #[test]
    fn submit_line_with_no_elapsed_time_scores_zero() {
        let (mut engine, _) = strict(&["cat"]);
        engine.start_round();
        let rec = engine.submit_line("cat").unwrap();
        assert_eq!(rec.wpm(), 0.0);
        assert_eq!(rec.accuracy(), Some(0.0));
    }

    #[test]
    fn completed_snapshot_is_frozen() {
        let (mut engine, clock) = strict(&["cat"]);
        engine.start_round();
        engine.input_changed("c");
        clock.advance_secs(3.0);
        engine.input_changed("cat");
        clock.advance_secs(10.0);
        let snap = engine.snapshot();
        assert_eq!(snap.elapsed_secs, 3.0);
        assert_eq!(snap.cps, 1.0);
    }

    #[test]
    fn timed_mode_needs_explicit_start() {
        let (mut engine, _) = engine_with(&["abc"], Mode::Timed, CorrectionPolicy::StrictPrefix);
        engine.start_round();
        assert_eq!(engine.input_changed("a"), None);
        assert_eq!(engine.state(), SessionState::Armed);
        assert_eq!(engine.buffer(), "");
        assert_eq!(engine.snapshot().remaining_secs, Some(15));
        assert!(!engine.is_ticking());

        assert!(engine.ready());
        assert!(engine.is_ticking());
        assert_eq!(engine.state(), SessionState::Active);
    }

    #[test]
    fn timed_sentences_stream_without_ending_the_run() {
        let (mut engine, _) = engine_with(&["abc"], Mode::Timed, CorrectionPolicy::StrictPrefix);
        engine.start_round();
        engine.ready();
        assert_eq!(engine.input_changed("abc"), None);
        assert_eq!(engine.input_changed("abc"), None);

        let snap = engine.snapshot();
        assert_eq!(snap.state, SessionState::Active);
        assert_eq!(snap.sentences_completed, Some(2));
        assert_eq!(snap.buffer, "");
        assert_eq!(snap.target, "abc");
        assert!(engine.log().is_empty());
    }

    #[test]
    fn timed_run_ends_on_last_tick() {
        let (mut engine, clock) = engine_with(&["abcde"], Mode::Timed, CorrectionPolicy::StrictPrefix);
        engine.start_round();
        engine.ready();
        engine.input_changed("abcde");
        engine.input_changed("ab");

        for _ in 0..14 {
            clock.advance_secs(1.0);
            assert_eq!(engine.tick(), None);
        }
        assert_eq!(engine.snapshot().remaining_secs, Some(1));
        clock.advance_secs(1.0);
        let rec = engine.tick().unwrap();

        assert_matches!(
            &rec,
            RoundRecord::Timed(TimedResult { chars: 5, sentences: 1, duration_secs: 15, .. })
        );
        assert_eq!(rec.wpm(), metrics::wpm(5, 15.0));
        assert!(!engine.is_ticking());
        // re-armed for the next run
        assert_eq!(engine.state(), SessionState::Armed);
        assert_eq!(engine.snapshot().remaining_secs, Some(15));
        assert_eq!(engine.snapshot().sentences_completed, Some(0));
        assert_eq!(engine.last_record(), Some(&rec));
    }

    #[test]
    fn ticks_are_ignored_unless_running() {
        let (mut engine, _) = engine_with(&["abc"], Mode::Timed, CorrectionPolicy::StrictPrefix);
        assert_eq!(engine.tick(), None);
        engine.start_round();
        assert_eq!(engine.tick(), None);
        assert_eq!(engine.snapshot().remaining_secs, Some(15));

        let (mut sentence, _) = strict(&["abc"]);
        sentence.start_round();
        sentence.input_changed("a");
        assert_eq!(sentence.tick(), None);
        assert_eq!(sentence.state(), SessionState::Active);
    }

    #[test]
    fn time_limit_applies_immediately_when_not_running() {
        let (mut engine, _) = engine_with(&["abc"], Mode::Timed, CorrectionPolicy::StrictPrefix);
        engine.start_round();
        engine.set_time_limit(30).unwrap();
        assert_eq!(engine.snapshot().remaining_secs, Some(30));
    }

    #[test]
    fn time_limit_does_not_touch_a_running_run() {
        let (mut engine, _) = engine_with(&["abc"], Mode::Timed, CorrectionPolicy::StrictPrefix);
        engine.start_round();
        engine.ready();
        engine.tick();
        engine.set_time_limit(120).unwrap();
        assert_eq!(engine.snapshot().remaining_secs, Some(14));

        for _ in 0..14 {
            engine.tick();
        }
        assert_eq!(engine.state(), SessionState::Armed);
        assert_eq!(engine.snapshot().remaining_secs, Some(120));
    }

    #[test]
    fn unsupported_time_limit_is_rejected() {
        let (mut engine, _) = engine_with(&["abc"], Mode::Timed, CorrectionPolicy::StrictPrefix);
        assert_eq!(
            engine.set_time_limit(45),
            Err(ConfigError::UnsupportedTimeLimit(45))
        );
        assert_eq!(engine.config().time_limit.secs(), 15);
    }

    #[test]
    fn mode_switch_refused_while_active() {
        let (mut engine, _) = strict(&["cat"]);
        engine.start_round();
        engine.input_changed("c");
        assert!(!engine.switch_mode(Mode::Timed));
        assert_eq!(engine.state(), SessionState::Active);
        assert_eq!(engine.mode(), Mode::Sentence);
        assert_eq!(engine.buffer(), "c");
    }

    #[test]
    fn mode_switch_rearms_and_stops_ticks() {
        let (mut engine, _) = engine_with(&["abc"], Mode::Timed, CorrectionPolicy::StrictPrefix);
        engine.start_round();
        assert!(engine.switch_mode(Mode::Sentence));
        assert_eq!(engine.state(), SessionState::Armed);
        assert_eq!(engine.snapshot().remaining_secs, None);
        assert_eq!(engine.tick(), None);

        assert!(engine.switch_mode(Mode::Timed));
        assert_eq!(engine.snapshot().remaining_secs, Some(15));
        assert!(!engine.is_ticking());
    }

    #[test]
    fn seeded_engines_pick_the_same_targets() {
        let sentences = ["one", "two", "three", "four", "five"];
        let pick = |seed| {
            let (engine, _) = strict(&sentences);
            let mut engine = engine.with_seed(seed);
            (0..5)
                .map(|_| {
                    engine.switch_mode(Mode::Sentence);
                    engine.target().to_string()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(3), pick(3));
    }
}
