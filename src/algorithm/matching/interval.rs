//! Interval matching over the whole score-sorted population
//!
//! A single pass splits the sorted population into alternating control and
//! treated runs. Every treated record is matched against the two control
//! runs directly bracketing its own run, so the search for neighbours stays
//! local and the scan is linear in the population size.

use log::debug;

use crate::algorithm::matching::assembler::MatchAssembler;
use crate::algorithm::matching::merger::ControlUsage;
use crate::algorithm::matching::population::Population;
use crate::algorithm::matching::types::{Group, MatchSet, Record, Window};
use crate::config::MatchingConfig;
use crate::utils::progress;

/// Next input symbol seen by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// A control record
    Control,
    /// A treated record
    Treated,
    /// The sorted population is exhausted
    End,
}

impl From<Group> for Symbol {
    fn from(group: Group) -> Self {
        match group {
            Group::Control => Self::Control,
            Group::Treated => Self::Treated,
        }
    }
}

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Nothing seen yet
    #[default]
    Start,
    /// Inside the control run preceding a treated run
    LeadingControl,
    /// Inside a treated run
    TreatedRun,
    /// Inside the control run following a treated run
    TrailingControl,
    /// Input exhausted
    Done,
}

/// Effect of a transition on the run bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Open or extend the leading control run
    ExtendLeading,
    /// Open a treated run
    OpenTreated,
    /// Extend the current treated run
    ExtendTreated,
    /// Open the trailing control run
    OpenTrailing,
    /// Extend the trailing control run
    ExtendTrailing,
    /// Match the current interval; the trailing run becomes the leading run
    /// and the current record opens a new treated run
    MatchAndSlide,
    /// Match the current interval and stop
    MatchAndFinish,
    /// Stop without matching
    Finish,
}

impl ScanState {
    /// Transition table: next state and bound update for `symbol`
    #[must_use]
    pub const fn next(self, symbol: Symbol) -> (Self, Step) {
        match (self, symbol) {
            (Self::Start | Self::LeadingControl, Symbol::Control) => {
                (Self::LeadingControl, Step::ExtendLeading)
            }
            (Self::Start | Self::LeadingControl, Symbol::Treated) => {
                (Self::TreatedRun, Step::OpenTreated)
            }
            (Self::TreatedRun, Symbol::Treated) => (Self::TreatedRun, Step::ExtendTreated),
            (Self::TreatedRun, Symbol::Control) => (Self::TrailingControl, Step::OpenTrailing),
            (Self::TreatedRun | Self::TrailingControl, Symbol::End) => {
                (Self::Done, Step::MatchAndFinish)
            }
            (Self::TrailingControl, Symbol::Control) => {
                (Self::TrailingControl, Step::ExtendTrailing)
            }
            (Self::TrailingControl, Symbol::Treated) => (Self::TreatedRun, Step::MatchAndSlide),
            (Self::Start | Self::LeadingControl, Symbol::End) | (Self::Done, _) => {
                (Self::Done, Step::Finish)
            }
        }
    }
}

/// Treated run with its bracketing control runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval {
    /// Control run below the treated run
    pub leading: Window,
    /// Treated run
    pub treated: Window,
    /// Control run above the treated run
    pub trailing: Window,
}

impl Interval {
    /// Apply `step` for the record at position `pos`
    ///
    /// Returns the interval to match when the step finalizes one.
    pub fn apply(&mut self, step: Step, pos: usize) -> Option<Self> {
        match step {
            Step::ExtendLeading => {
                self.leading.end = pos + 1;
                None
            }
            Step::OpenTreated => {
                self.treated = Window::new(pos, pos + 1);
                self.trailing = Window::empty(pos + 1);
                None
            }
            Step::ExtendTreated => {
                self.treated.end = pos + 1;
                self.trailing = Window::empty(pos + 1);
                None
            }
            Step::OpenTrailing => {
                self.trailing = Window::new(pos, pos + 1);
                None
            }
            Step::ExtendTrailing => {
                self.trailing.end = pos + 1;
                None
            }
            Step::MatchAndSlide => {
                let finished = *self;
                self.leading = finished.trailing;
                self.treated = Window::new(pos, pos + 1);
                self.trailing = Window::empty(pos + 1);
                Some(finished)
            }
            Step::MatchAndFinish => Some(*self),
            Step::Finish => None,
        }
    }
}

/// Split a score-sorted sequence into intervals, in scan order
#[must_use]
pub fn scan_intervals(sequence: &[Record]) -> Vec<Interval> {
    let mut intervals = Vec::new();
    let mut state = ScanState::Start;
    let mut bounds = Interval::default();

    for pos in 0..=sequence.len() {
        let symbol = sequence.get(pos).map_or(Symbol::End, |r| Symbol::from(r.group));
        let (next, step) = state.next(symbol);
        if let Some(interval) = bounds.apply(step, pos) {
            intervals.push(interval);
        }
        state = next;
        if state == ScanState::Done {
            break;
        }
    }

    intervals
}

/// Match every treated record against the control runs bracketing its run
///
/// Each treated record queries the merger independently over the same
/// windows, so with replacement a control near a run boundary can be chosen
/// by several treated records.
#[must_use]
pub fn match_intervals(population: &Population, config: &MatchingConfig) -> MatchSet {
    let sequence = population.sorted();
    let k = config.nmatches;
    let mut assembler = MatchAssembler::with_capacity(population.treated_count());
    let mut usage = ControlUsage::new(config.with_replacement);

    let pb = progress::create_main_progress_bar(
        population.treated_count() as u64,
        Some("Interval matching"),
        config.show_progress,
    );

    for interval in scan_intervals(&sequence) {
        debug!(
            "Matching treated run {:?} against controls {:?} and {:?}",
            interval.treated, interval.leading, interval.trailing
        );

        for pos in interval.treated.start..interval.treated.end {
            let treated = &sequence[pos];
            let neighbours = usage.merge(
                &sequence,
                treated.score,
                interval.leading,
                interval.trailing,
                k,
            );

            assembler.push(treated.row, neighbours.iter().map(|&p| sequence[p].row));
            pb.inc(1);
        }
    }

    progress::finish_progress_bar(&pb, Some("Matching complete"));
    assembler.finish()
}
