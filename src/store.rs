//! The two reactor representations behind one `VolumeStore` contract.
//!
//! `DenseStore` holds every cell of a bounded symmetric envelope in an
//! eagerly-allocated `Array3<bool>`. `SparseStore` holds only the cubes
//! that are currently on, so it works on unbounded coordinate space.
//! `Reactor` picks between them at construction time and drives a step
//! stream through whichever was chosen.

use std::cmp::{max, min};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use ndarray::Array3;
use tracing::{event, Level};

use crate::step::{Command, Envelope, FormatError};

/// Rejected reactor configuration: an even, nonzero side size. Fatal at
/// startup; no steps are processed.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "bad reactor configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// A single unit cube's position.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Coordinate(pub i32, pub i32, pub i32);

/// What both reactor representations promise: apply one command and
/// report the signed change in lit cubes, keeping a running count that
/// always equals the true cardinality of the on-set.
pub trait VolumeStore {
    /// Flip the cubes covered by `cmd`, returning the net number newly
    /// turned on (negative when the step turns cubes off, zero when it
    /// changes nothing or was flagged out of range).
    fn apply(&mut self, cmd: &Command) -> i64;

    /// The number of cubes currently on.
    fn on_count(&self) -> u64;

    /// The number of cubes currently off. Only meaningful for a bounded
    /// reactor; the sparse representation has no finite domain.
    fn off_count(&self) -> Option<u64>;
}

fn intersect(r: &Range<i32>, domain: &Range<i32>) -> Range<i32> {
    max(r.start, domain.start)..min(r.end, domain.end)
}

/// Bounded reactor: one bool per cell of `[-half, half]^3`.
pub struct DenseStore {
    envelope: Envelope,
    cells: Array3<bool>,
    on: u64,
}

impl DenseStore {
    /// Allocate every cell of a cube `side_size` on a side, all off.
    /// `side_size` must be odd so the envelope is symmetric around the
    /// origin.
    pub fn new(side_size: u32) -> Result<DenseStore, ConfigError> {
        if side_size % 2 == 0 {
            return Err(ConfigError(format!(
                "side_size should be odd, was {}",
                side_size
            )));
        }
        let side = side_size as usize;
        Ok(DenseStore {
            envelope: Envelope::new(side_size),
            cells: Array3::from_elem((side, side, side), false),
            on: 0,
        })
    }

    fn domain(&self) -> Range<i32> {
        let half = self.envelope.half();
        -half..half + 1
    }
}

impl VolumeStore for DenseStore {
    fn apply(&mut self, cmd: &Command) -> i64 {
        // Any step that escapes the envelope on any axis is dropped
        // wholesale. Not clipped: that is the documented policy of this
        // representation, however surprising next to the sparse one.
        if cmd.out_of_range {
            event!(Level::DEBUG, "skipping out-of-range step {:?}", cmd.step);
            return 0;
        }
        let domain = self.domain();
        let half = self.envelope.half();
        let region = &cmd.step.region;
        let state = cmd.step.state;
        let mut delta: i64 = 0;
        for x in intersect(&region.x, &domain) {
            for y in intersect(&region.y, &domain) {
                for z in intersect(&region.z, &domain) {
                    let pos = (
                        (x + half) as usize,
                        (y + half) as usize,
                        (z + half) as usize,
                    );
                    if self.cells[pos] != state {
                        self.cells[pos] = state;
                        delta += if state { 1 } else { -1 };
                    }
                }
            }
        }
        self.on = (self.on as i64 + delta) as u64;
        delta
    }

    fn on_count(&self) -> u64 {
        self.on
    }

    fn off_count(&self) -> Option<u64> {
        let side = self.envelope.side_size() as u64;
        Some(side * side * side - self.on)
    }
}

/// Unbounded reactor: remembers only the cubes that are on. Memory is
/// proportional to the lit volume, never to the addressable space; a
/// single apply still visits every cell its cuboid encloses.
pub struct SparseStore {
    lit: HashSet<Coordinate>,
    on: u64,
}

impl SparseStore {
    pub fn new() -> SparseStore {
        SparseStore {
            lit: HashSet::new(),
            on: 0,
        }
    }
}

impl Default for SparseStore {
    fn default() -> SparseStore {
        SparseStore::new()
    }
}

impl VolumeStore for SparseStore {
    fn apply(&mut self, cmd: &Command) -> i64 {
        // A finite envelope may still have been configured at parse
        // time; its verdict is honored here too.
        if cmd.out_of_range {
            event!(Level::DEBUG, "skipping out-of-range step {:?}", cmd.step);
            return 0;
        }
        let region = &cmd.step.region;
        let state = cmd.step.state;
        let mut delta: i64 = 0;
        for x in region.x.clone() {
            for y in region.y.clone() {
                for z in region.z.clone() {
                    if state {
                        if self.lit.insert(Coordinate(x, y, z)) {
                            delta += 1;
                        }
                    } else if self.lit.remove(&Coordinate(x, y, z)) {
                        delta -= 1;
                    }
                }
            }
        }
        self.on = (self.on as i64 + delta) as u64;
        delta
    }

    fn on_count(&self) -> u64 {
        self.on
    }

    fn off_count(&self) -> Option<u64> {
        None
    }
}

/// The engine facade: owns the envelope and whichever representation it
/// selected at construction, and folds step lines through it.
pub struct Reactor {
    envelope: Envelope,
    store: Box<dyn VolumeStore>,
}

impl Reactor {
    /// Choose a representation for the given envelope: `side_size == 0`
    /// means unbounded (sparse), a positive odd value means bounded
    /// (dense), and an even nonzero value is a configuration error. The
    /// choice is never renegotiated mid-run.
    pub fn new(side_size: u32) -> Result<Reactor, ConfigError> {
        let envelope = Envelope::new(side_size);
        let store: Box<dyn VolumeStore> = if envelope.is_unbounded() {
            Box::new(SparseStore::new())
        } else {
            Box::new(DenseStore::new(side_size)?)
        };
        Ok(Reactor { envelope, store })
    }

    /// Parse and apply one step line, returning its delta.
    pub fn process_step(&mut self, text: &str) -> Result<i64, FormatError> {
        let cmd = Command::parse(text, &self.envelope)?;
        let delta = self.store.apply(&cmd);
        event!(
            Level::DEBUG,
            "'{}': delta={}, on={}",
            text,
            delta,
            self.store.on_count(),
        );
        Ok(delta)
    }

    /// Fold every step line through the store, strictly in order (later
    /// steps can invert earlier ones), and return the final on-count. A
    /// malformed line aborts the whole run.
    pub fn process_steps<I>(&mut self, lines: I) -> Result<u64, FormatError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            self.process_step(line.as_ref())?;
        }
        Ok(self.on_count())
    }

    pub fn on_count(&self) -> u64 {
        self.store.on_count()
    }

    pub fn off_count(&self) -> Option<u64> {
        self.store.off_count()
    }
}

#[cfg(test)]
fn command(text: &str, envelope: &Envelope) -> Command {
    Command::parse(text, envelope).expect("test step should parse")
}

#[test]
fn test_dense_construction() {
    assert!(matches!(DenseStore::new(4), Err(ConfigError(_))));
    assert!(matches!(DenseStore::new(100), Err(ConfigError(_))));
    let r = DenseStore::new(11).expect("odd side should be accepted");
    assert_eq!(r.on_count(), 0);
    assert_eq!(r.off_count(), Some(11 * 11 * 11));
}

#[test]
fn test_dense_documented_example() {
    let envelope = Envelope::new(5);
    let mut r = DenseStore::new(5).unwrap();
    assert_eq!(r.apply(&command("on x=-2..1,y=1..2,z=1..1", &envelope)), 8);
    assert_eq!(
        r.apply(&command("off x=-2..-2,y=0..1,z=1..2", &envelope)),
        -1
    );
    assert_eq!(r.on_count(), 7);
    assert_eq!(r.off_count(), Some(5 * 5 * 5 - 7));
}

#[test]
fn test_dense_out_of_range_step_is_a_no_op() {
    let envelope = Envelope::new(3);
    let mut r = DenseStore::new(3).unwrap();
    assert_eq!(r.apply(&command("on x=-1..1,y=0..0,z=1..1", &envelope)), 3);
    for text in [
        "on x=5..10,y=0..0,z=1..1",
        "on x=-1..1,y=-2..0,z=0..0",
        "off x=-1..1,y=0..0,z=-1..2",
    ] {
        assert_eq!(r.apply(&command(text, &envelope)), 0, "'{}'", text);
        assert_eq!(r.on_count(), 3, "'{}' must not alter the count", text);
    }
}

#[test]
fn test_dense_repeated_step_is_idempotent() {
    let envelope = Envelope::new(5);
    let mut r = DenseStore::new(5).unwrap();
    let on = command("on x=-2..1,y=1..2,z=1..1", &envelope);
    assert_eq!(r.apply(&on), 8);
    assert_eq!(r.apply(&on), 0);
    let off = command("off x=-2..1,y=1..2,z=1..1", &envelope);
    assert_eq!(r.apply(&off), -8);
    assert_eq!(r.apply(&off), 0);
}

#[test]
fn test_dense_cached_count_matches_cell_scan() {
    let envelope = Envelope::new(5);
    let mut r = DenseStore::new(5).unwrap();
    for text in [
        "on x=-2..1,y=1..2,z=1..1",
        "off x=-2..-2,y=0..1,z=1..2",
        "on x=0..0,y=0..0,z=0..0",
        "off x=-2..2,y=-2..2,z=-2..2",
    ] {
        r.apply(&command(text, &envelope));
        let scanned = r.cells.iter().filter(|cell| **cell).count() as u64;
        assert_eq!(r.on_count(), scanned, "after '{}'", text);
    }
}

#[test]
fn test_sparse_documented_example() {
    let envelope = Envelope::unbounded();
    let mut r = SparseStore::new();
    assert_eq!(r.apply(&command("on x=-1..1,y=0..0,z=1..1", &envelope)), 3);
    assert_eq!(
        r.apply(&command("off x=-1..-1,y=0..0,z=1..2", &envelope)),
        -1
    );
    assert_eq!(r.on_count(), 2);
    assert_eq!(r.off_count(), None);
}

#[test]
fn test_sparse_repeated_step_is_idempotent() {
    let envelope = Envelope::unbounded();
    let mut r = SparseStore::new();
    let on = command("on x=10..12,y=-3..-3,z=7..7", &envelope);
    assert_eq!(r.apply(&on), 3);
    assert_eq!(r.apply(&on), 0);
    let off = command("off x=10..10,y=-3..-3,z=7..7", &envelope);
    assert_eq!(r.apply(&off), -1);
    assert_eq!(r.apply(&off), 0);
}

#[test]
fn test_sparse_honors_an_envelope_verdict() {
    // Parsed against a finite envelope, an escaping step stays skipped
    // even in the sparse representation.
    let envelope = Envelope::new(3);
    let mut r = SparseStore::new();
    assert_eq!(r.apply(&command("on x=5..10,y=0..0,z=1..1", &envelope)), 0);
    assert_eq!(r.on_count(), 0);
}

#[test]
fn test_sparse_cached_count_matches_set_size() {
    let envelope = Envelope::unbounded();
    let mut r = SparseStore::new();
    for text in [
        "on x=-1..1,y=0..0,z=1..1",
        "off x=-1..-1,y=0..0,z=1..2",
        "on x=100000..100001,y=0..0,z=0..0",
        "off x=-10..10,y=-10..10,z=-10..10",
    ] {
        r.apply(&command(text, &envelope));
        assert_eq!(r.on_count(), r.lit.len() as u64, "after '{}'", text);
    }
}

#[test]
fn test_sparse_handles_far_flung_coordinates() {
    let envelope = Envelope::unbounded();
    let mut r = SparseStore::new();
    assert_eq!(
        r.apply(&command(
            "on x=-54112..-54110,y=-85059..-85059,z=7877..7877",
            &envelope
        )),
        3
    );
    assert_eq!(r.on_count(), 3);
}

#[test]
fn test_step_order_is_significant() {
    // R2 is inside R1, so applying "off R2" before "on R1" leaves a
    // different reactor than applying it after.
    let on_r1 = "on x=0..2,y=0..0,z=0..0";
    let off_r2 = "off x=1..1,y=0..0,z=0..0";

    let mut forward = Reactor::new(5).unwrap();
    assert_eq!(forward.process_steps([on_r1, off_r2]).unwrap(), 2);

    let mut reversed = Reactor::new(5).unwrap();
    assert_eq!(reversed.process_steps([off_r2, on_r1]).unwrap(), 3);
}

#[test]
fn test_reactor_factory() {
    assert!(matches!(Reactor::new(4), Err(ConfigError(_))));

    let dense = Reactor::new(5).expect("odd side should be accepted");
    assert_eq!(dense.on_count(), 0);
    assert_eq!(dense.off_count(), Some(125));

    let sparse = Reactor::new(0).expect("zero side means unbounded");
    assert_eq!(sparse.on_count(), 0);
    assert_eq!(sparse.off_count(), None);
}

#[test]
fn test_reactor_process_steps_returns_final_count() {
    let mut r = Reactor::new(0).unwrap();
    let count = r
        .process_steps(["on x=-1..1,y=0..0,z=1..1", "off x=-1..-1,y=0..0,z=1..2"])
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(r.on_count(), 2);
}

#[test]
fn test_reactor_aborts_on_malformed_line() {
    let mut r = Reactor::new(5).unwrap();
    let result = r.process_steps([
        "on x=0..1,y=0..0,z=0..0",
        "onward x=0..0,y=0..0,z=0..0",
        "on x=-2..2,y=-2..2,z=-2..2",
    ]);
    assert!(matches!(result, Err(FormatError(_))));
    // The failing line stopped the stream; the third step never ran.
    assert_eq!(r.on_count(), 2);
}
