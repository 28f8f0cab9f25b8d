//! Named image axes and coordinates.
//!
//! ND2 files expose up to seven logical axes: the two planar axes `x`/`y`,
//! the channel axis `c`, and one axis per acquisition loop (`t` time,
//! `m` multipoint, `z` focal plane, `o` other).

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Logical image axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    C,
    Z,
    T,
    M,
    O,
}

impl Axis {
    /// All axes in canonical order.
    pub const ALL: [Axis; 7] = [
        Axis::X,
        Axis::Y,
        Axis::C,
        Axis::Z,
        Axis::T,
        Axis::M,
        Axis::O,
    ];

    /// Single-letter name.
    pub fn as_char(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::C => 'c',
            Self::Z => 'z',
            Self::T => 't',
            Self::M => 'm',
            Self::O => 'o',
        }
    }

    /// Parse a single-letter axis name.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'x' => Some(Self::X),
            'y' => Some(Self::Y),
            'c' => Some(Self::C),
            'z' => Some(Self::Z),
            't' => Some(Self::T),
            'm' => Some(Self::M),
            'o' => Some(Self::O),
            _ => None,
        }
    }

    /// Whether this is one of the in-plane axes (`x` or `y`).
    pub fn is_planar(self) -> bool {
        matches!(self, Self::X | Self::Y)
    }

    /// Parse an axis list such as `"zyx"` or `"c,y,x"`.
    ///
    /// Separators (commas, whitespace) are ignored. Duplicates are rejected.
    pub fn parse_list(s: &str) -> Result<Vec<Axis>, AxisParseError> {
        let mut axes = Vec::new();
        for c in s.chars().filter(|c| !c.is_whitespace() && *c != ',') {
            let axis = Self::from_char(c).ok_or(AxisParseError::UnknownAxis(c))?;
            if axes.contains(&axis) {
                return Err(AxisParseError::Duplicate(axis));
            }
            axes.push(axis);
        }
        Ok(axes)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Axis {
    type Err = AxisParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c).ok_or(AxisParseError::UnknownAxis(c)),
            _ => Err(AxisParseError::InvalidName(s.to_string())),
        }
    }
}

/// Format an axis list as its compact name (`[Z, Y, X]` → `"zyx"`).
pub fn axes_to_string(axes: &[Axis]) -> String {
    axes.iter().map(|a| a.as_char()).collect()
}

/// Error parsing axis names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AxisParseError {
    #[error("Unknown axis '{0}'")]
    UnknownAxis(char),

    #[error("Invalid axis name '{0}'")]
    InvalidName(String),

    #[error("Axis '{0}' listed more than once")]
    Duplicate(Axis),
}

/// Axis sizes in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AxisSizes {
    entries: Vec<(Axis, usize)>,
}

impl AxisSizes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an axis. Returns `false` (and leaves the sizes unchanged)
    /// if the axis is already present.
    pub fn insert(&mut self, axis: Axis, size: usize) -> bool {
        if self.contains(axis) {
            return false;
        }
        self.entries.push((axis, size));
        true
    }

    pub fn get(&self, axis: Axis) -> Option<usize> {
        self.entries
            .iter()
            .find(|(a, _)| *a == axis)
            .map(|(_, size)| *size)
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.entries.iter().any(|(a, _)| *a == axis)
    }

    /// Axes in registration order.
    pub fn axes(&self) -> impl Iterator<Item = Axis> + '_ {
        self.entries.iter().map(|(a, _)| *a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, usize)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AxisSizes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (axis, size) in &self.entries {
            map.serialize_entry(axis, size)?;
        }
        map.end()
    }
}

impl fmt::Display for AxisSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(a, s)| format!("{a}={s}"))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// A coordinate per axis. Missing axes are unspecified.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coords(BTreeMap<Axis, usize>);

impl Coords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, axis: Axis, index: usize) -> Self {
        self.0.insert(axis, index);
        self
    }

    pub fn set(&mut self, axis: Axis, index: usize) {
        self.0.insert(axis, index);
    }

    pub fn get(&self, axis: Axis) -> Option<usize> {
        self.0.get(&axis).copied()
    }

    /// Coordinate for `axis`, or 0 when unspecified.
    pub fn get_or_zero(&self, axis: Axis) -> usize {
        self.get(axis).unwrap_or(0)
    }

    pub fn remove(&mut self, axis: Axis) -> Option<usize> {
        self.0.remove(&axis)
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.0.contains_key(&axis)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, usize)> + '_ {
        self.0.iter().map(|(a, i)| (*a, *i))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Axis, usize)> for Coords {
    fn from_iter<I: IntoIterator<Item = (Axis, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Coordinates used for axes that are neither bundled into a frame nor
/// iterated over. Unset axes resolve to 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultCoords {
    coords: Coords,
}

impl DefaultCoords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, axis: Axis, index: usize) {
        self.coords.set(axis, index);
    }

    pub fn resolve(&self, axis: Axis) -> usize {
        self.coords.get_or_zero(axis)
    }

    /// Explicitly configured defaults.
    pub fn as_coords(&self) -> &Coords {
        &self.coords
    }
}
