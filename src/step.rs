//! Reboot-step grammar and the out-of-range policy.
//!
//! A step line looks like `on x=-20..26,y=-36..17,z=-47..7`. The command
//! token is matched case-insensitively; each axis clause is two `..`
//! separated signed integers. Upper bounds are stored exclusive so that
//! both reactor representations work with half-open intervals.

use std::fmt::{self, Display, Formatter};
use std::ops::Range;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, recognize},
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};

/// A step line that does not match the required grammar. Fatal to the
/// run: the caller aborts the remaining stream rather than skip a line.
#[derive(Debug, PartialEq, Eq)]
pub struct FormatError(pub String);

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "malformed reboot step: {}", self.0)
    }
}

impl std::error::Error for FormatError {}

/// The symmetric coordinate bound `[-half, +half]` enforced by the dense
/// reactor. A `side_size` of zero means unbounded (no envelope at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    side_size: u32,
}

impl Envelope {
    pub fn new(side_size: u32) -> Envelope {
        Envelope { side_size }
    }

    pub fn unbounded() -> Envelope {
        Envelope { side_size: 0 }
    }

    pub fn side_size(&self) -> u32 {
        self.side_size
    }

    pub fn is_unbounded(&self) -> bool {
        self.side_size == 0
    }

    pub fn half(&self) -> i32 {
        (self.side_size / 2) as i32
    }
}

/// An axis-aligned region of unit cubes. Each axis range is half-open:
/// the inclusive upper bound of the input grammar is stored as `end + 1`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Cuboid {
    pub x: Range<i32>,
    pub y: Range<i32>,
    pub z: Range<i32>,
}

impl Cuboid {
    /// Number of unit cubes enclosed.
    pub fn volume(&self) -> u64 {
        axis_len(&self.x) * axis_len(&self.y) * axis_len(&self.z)
    }

    /// True unless every axis range lies within `[-half, half]`.
    /// Partially-outside counts as outside: the dense reactor skips
    /// such a step wholesale instead of clipping it.
    fn escapes(&self, envelope: &Envelope) -> bool {
        if envelope.is_unbounded() {
            return false;
        }
        let half = envelope.half();
        [&self.x, &self.y, &self.z]
            .iter()
            .any(|r| r.start < -half || r.end > half + 1)
    }
}

fn axis_len(r: &Range<i32>) -> u64 {
    if r.is_empty() {
        0
    } else {
        (r.end - r.start) as u64
    }
}

/// One parsed reboot step: the target state and the region it covers.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Step {
    pub state: bool,
    pub region: Cuboid,
}

/// A step together with its range verdict against the envelope it was
/// parsed under. This is the unit the reactors consume.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Command {
    pub step: Step,
    pub out_of_range: bool,
}

impl Command {
    /// Parse one step line, flagging it out-of-range when any axis bound
    /// falls outside the envelope.
    pub fn parse(text: &str, envelope: &Envelope) -> Result<Command, FormatError> {
        let step = match parse_step(text) {
            Ok(("", step)) => step,
            Ok((tail, _)) => {
                return Err(FormatError(format!(
                    "unexpected trailing junk in '{}': '{}'",
                    text, tail
                )));
            }
            Err(e) => {
                return Err(FormatError(format!("cannot parse '{}': {}", text, e)));
            }
        };
        let out_of_range = step.region.escapes(envelope);
        Ok(Command { step, out_of_range })
    }
}

fn i32_parser(input: &str) -> IResult<&str, i32> {
    map_res(
        recognize(tuple((opt(char('-')), digit1))),
        FromStr::from_str,
    )(input)
}

// The input guarantees min <= max on every axis; we do not re-check it.
// The upper bound becomes exclusive here.
fn parse_axis(input: &str) -> IResult<&str, Range<i32>> {
    map(
        separated_pair(i32_parser, tag(".."), i32_parser),
        |(begin, end)| begin..end + 1,
    )(input)
}

fn parse_region(input: &str) -> IResult<&str, Cuboid> {
    map(
        tuple((
            delimited(tag("x="), parse_axis, tag(",")),
            delimited(tag("y="), parse_axis, tag(",")),
            preceded(tag("z="), parse_axis),
        )),
        |(x, y, z)| Cuboid { x, y, z },
    )(input)
}

fn parse_state(input: &str) -> IResult<&str, bool> {
    alt((
        map(tag_no_case("on"), |_| true),
        map(tag_no_case("off"), |_| false),
    ))(input)
}

fn parse_step(input: &str) -> IResult<&str, Step> {
    map(
        separated_pair(parse_state, tag(" "), parse_region),
        |(state, region)| Step { state, region },
    )(input)
}

#[test]
fn test_parse_on_step() {
    let cmd = Command::parse(
        "on x=-54112..-39298,y=-85059..-49293,z=-27449..7877",
        &Envelope::unbounded(),
    )
    .expect("valid step");
    assert_eq!(
        cmd.step,
        Step {
            state: true,
            region: Cuboid {
                x: -54112..-39297,
                y: -85059..-49292,
                z: -27449..7878,
            },
        }
    );
    assert!(!cmd.out_of_range);
}

#[test]
fn test_parse_off_step() {
    let cmd = Command::parse("off x=1..2,y=3..4,z=5..6", &Envelope::unbounded())
        .expect("valid step");
    assert!(!cmd.step.state);
    assert_eq!(cmd.step.region.x, 1..3);
    assert_eq!(cmd.step.region.y, 3..5);
    assert_eq!(cmd.step.region.z, 5..7);
}

#[test]
fn test_parse_command_token_is_case_insensitive() {
    for text in ["ON x=0..0,y=0..0,z=0..0", "Off x=0..0,y=0..0,z=0..0"] {
        assert!(Command::parse(text, &Envelope::unbounded()).is_ok());
    }
}

#[test]
fn test_parse_rejects_bad_lines() {
    let envelope = Envelope::unbounded();
    for text in [
        "boom x=0..0,y=0..0,z=0..0", // unknown command token
        "on x=0..0,y=0..0",          // missing axis clause
        "on x=0..a,y=0..0,z=0..0",   // non-numeric bound
        "on x=0,y=0..0,z=0..0",      // axis clause without '..'
        "on x=0..0,y=0..0,z=0..0 and more", // trailing junk
        "",
    ] {
        assert!(
            matches!(Command::parse(text, &envelope), Err(FormatError(_))),
            "'{}' should not parse",
            text
        );
    }
}

#[test]
fn test_out_of_range_verdict() {
    let envelope = Envelope::new(3); // half = 1
    let inside = Command::parse("on x=-1..1,y=0..1,z=-1..0", &envelope).unwrap();
    assert!(!inside.out_of_range);

    // One axis escaping on either side taints the whole step.
    for text in [
        "on x=-2..1,y=0..0,z=0..0",
        "on x=0..0,y=0..2,z=0..0",
        "on x=0..0,y=0..0,z=-9..-2",
        "on x=5..10,y=0..0,z=1..1",
    ] {
        let cmd = Command::parse(text, &envelope).unwrap();
        assert!(cmd.out_of_range, "'{}' should be out of range", text);
    }
}

#[test]
fn test_unbounded_envelope_never_flags() {
    let cmd = Command::parse(
        "on x=-1000000..1000000,y=0..0,z=0..0",
        &Envelope::unbounded(),
    )
    .unwrap();
    assert!(!cmd.out_of_range);
}

#[test]
fn test_cuboid_volume() {
    let cmd = Command::parse("on x=-2..1,y=1..2,z=1..1", &Envelope::unbounded()).unwrap();
    assert_eq!(cmd.step.region.volume(), 8);
}
