//! Core scalar types and identifiers shared across the waveform core:
//! `Time`, `Timescale`, `SignalHandle`, `SignalNodeID`, `DisplayFormat`, and
//! the `TimeUnit` exponent table used by the time ruler.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A point in time expressed in timescale units. Monotonically
/// non-decreasing along any signal's transition list.
pub type Time = i64;

/// Opaque primary key into the DB's signal cache. Aliased hierarchical
/// paths resolve to the same handle.
pub type SignalHandle = u64;

/// Per-process unique identifier assigned monotonically at node creation.
pub type SignalNodeID = u64;

/// Monotonic source of [`SignalNodeID`]s, never reused within a session.
///
/// The Python original relies on a class-level counter
/// (`SignalNode._id_counter`); Rust has no implicit mutable statics, so this
/// is an explicit, session-owned atomic counter instead (see DESIGN.md).
#[derive(Debug, Default)]
pub struct NodeIdSource {
    next: AtomicU64,
}

impl Clone for NodeIdSource {
    fn clone(&self) -> Self {
        Self {
            next: AtomicU64::new(self.next.load(Ordering::Relaxed)),
        }
    }
}

impl NodeIdSource {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocates the next unique id.
    pub fn next_id(&self) -> SignalNodeID {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Reseeds the counter so the next allocated id is at least `min_next`.
    /// Used after deserializing a session (the counter itself is
    /// `#[serde(skip)]`) so freshly allocated ids can't collide with ids
    /// already present in the loaded tree.
    pub fn reseed(&self, min_next: SignalNodeID) {
        let mut current = self.next.load(Ordering::Relaxed);
        while current < min_next {
            match self.next.compare_exchange_weak(current, min_next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Zeptoseconds,
    Attoseconds,
    Femtoseconds,
    Picoseconds,
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// The base-10 exponent of seconds this unit represents.
    pub fn to_exponent(self) -> i32 {
        match self {
            TimeUnit::Zeptoseconds => -21,
            TimeUnit::Attoseconds => -18,
            TimeUnit::Femtoseconds => -15,
            TimeUnit::Picoseconds => -12,
            TimeUnit::Nanoseconds => -9,
            TimeUnit::Microseconds => -6,
            TimeUnit::Milliseconds => -3,
            TimeUnit::Seconds => 0,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Zeptoseconds => "zs",
            TimeUnit::Attoseconds => "as",
            TimeUnit::Femtoseconds => "fs",
            TimeUnit::Picoseconds => "ps",
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }

    pub fn from_suffix(s: &str) -> Option<Self> {
        Some(match s {
            "zs" => TimeUnit::Zeptoseconds,
            "as" => TimeUnit::Attoseconds,
            "fs" => TimeUnit::Femtoseconds,
            "ps" => TimeUnit::Picoseconds,
            "ns" => TimeUnit::Nanoseconds,
            "us" | "\u{03bc}s" => TimeUnit::Microseconds,
            "ms" => TimeUnit::Milliseconds,
            "s" => TimeUnit::Seconds,
            _ => return None,
        })
    }

    /// The next coarser unit, used when a ruler label's magnitude grows
    /// past 1000 of the current unit so the ruler upgrades units automatically.
    pub fn coarser(self) -> Option<Self> {
        Some(match self {
            TimeUnit::Zeptoseconds => TimeUnit::Attoseconds,
            TimeUnit::Attoseconds => TimeUnit::Femtoseconds,
            TimeUnit::Femtoseconds => TimeUnit::Picoseconds,
            TimeUnit::Picoseconds => TimeUnit::Nanoseconds,
            TimeUnit::Nanoseconds => TimeUnit::Microseconds,
            TimeUnit::Microseconds => TimeUnit::Milliseconds,
            TimeUnit::Milliseconds => TimeUnit::Seconds,
            TimeUnit::Seconds => return None,
        })
    }
}

/// A timescale pair `(factor, unit)`; seconds = `factor * 10^unit.to_exponent() * t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timescale {
    pub factor: i32,
    pub unit: TimeUnit,
}

impl Default for Timescale {
    fn default() -> Self {
        Self {
            factor: 1,
            unit: TimeUnit::Picoseconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFormat {
    Unsigned,
    Signed,
    Hex,
    Bin,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderType {
    Bool,
    Bus,
    Event,
    Analog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalogScalingMode {
    ScaleAll,
    ScaleVisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupRenderMode {
    SeparateRows,
    Overlapped,
    StackedArea,
    Pipeline,
}

/// An explicit "theme default" sentinel rather than an implicit `None`
/// meaning two different things in two different fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RgbColor {
    ThemeDefault,
    Rgb(u8, u8, u8),
}

impl RgbColor {
    /// Parses a `#RRGGBB` string, as persisted in the session document.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#')?;
        if s.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(RgbColor::Rgb(r, g, b))
    }

    pub fn to_hex(self) -> Option<String> {
        match self {
            RgbColor::ThemeDefault => None,
            RgbColor::Rgb(r, g, b) => Some(format!("#{:02X}{:02X}{:02X}", r, g, b)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFormat {
    pub render_type: RenderType,
    pub data_format: DataFormat,
    pub color: Option<RgbColor>,
    pub analog_scaling_mode: AnalogScalingMode,
}

impl Default for DisplayFormat {
    fn default() -> Self {
        Self {
            render_type: RenderType::Bool,
            data_format: DataFormat::Unsigned,
            color: None,
            analog_scaling_mode: AnalogScalingMode::ScaleAll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_table_matches_python_original() {
        assert_eq!(TimeUnit::Picoseconds.to_exponent(), -12);
        assert_eq!(TimeUnit::Seconds.to_exponent(), 0);
        assert_eq!(TimeUnit::Zeptoseconds.to_exponent(), -21);
    }

    #[test]
    fn node_ids_are_unique_and_monotonic() {
        let source = NodeIdSource::new();
        let a = source.next_id();
        let b = source.next_id();
        assert!(b > a);
    }

    #[test]
    fn color_hex_round_trips() {
        let c = RgbColor::from_hex("#1e1e1e").unwrap();
        assert_eq!(c.to_hex().unwrap(), "#1E1E1E");
        assert_eq!(RgbColor::ThemeDefault.to_hex(), None);
    }
}
