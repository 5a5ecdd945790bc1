//! Concrete [`WaveformBackend`] over the `vcd` crate.
//!
//! Parses sequentially into an in-memory transition table, reporting
//! progress to the caller through a shared handle. The threaded load and
//! progress reporting itself lives in [`crate::worker`], which wraps
//! [`load_vcd_file`] so the parse runs off the main thread.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use vcd::{Command, IdCode, Parser, ScopeItem, TimescaleUnit, Value as VcdValue};

use crate::db::backend::{HierarchyEntry, SignalQueryResult, Transition, WaveformBackend};
use crate::errors::{DataError, InputError, WaveScoutError, WaveScoutResult};
use crate::types::{SignalHandle, Time, TimeUnit, Timescale};
use crate::value::RawValue;

struct SignalTrack {
    bit_width: u32,
    /// Sorted by time, ascending; no two entries share a time.
    transitions: Vec<(Time, RawValue)>,
}

pub struct VcdWaveform {
    hierarchy: HierarchyEntry,
    by_handle: HashMap<SignalHandle, SignalTrack>,
    paths: HashMap<String, SignalHandle>,
    max_time: Time,
    timescale: Timescale,
}

fn vcd_unit_to_time_unit(unit: TimescaleUnit) -> TimeUnit {
    match unit {
        TimescaleUnit::S => TimeUnit::Seconds,
        TimescaleUnit::MS => TimeUnit::Milliseconds,
        TimescaleUnit::US => TimeUnit::Microseconds,
        TimescaleUnit::NS => TimeUnit::Nanoseconds,
        TimescaleUnit::PS => TimeUnit::Picoseconds,
        TimescaleUnit::FS => TimeUnit::Femtoseconds,
    }
}

fn bits_to_raw(bits: &[VcdValue]) -> RawValue {
    let width = bits.len() as u32;
    if bits.iter().any(|v| matches!(v, VcdValue::X | VcdValue::Z)) {
        let literal: String = bits
            .iter()
            .map(|v| match v {
                VcdValue::V0 => '0',
                VcdValue::V1 => '1',
                VcdValue::X => 'x',
                VcdValue::Z => 'z',
            })
            .collect();
        return RawValue::Literal(literal);
    }
    let mut acc: u128 = 0;
    for v in bits {
        acc <<= 1;
        if matches!(v, VcdValue::V1) {
            acc |= 1;
        }
    }
    let _ = width;
    RawValue::Bits(acc, width)
}

fn scalar_to_raw(value: VcdValue) -> RawValue {
    bits_to_raw(&[value])
}

fn build_hierarchy(items: &[ScopeItem], path_prefix: &str, paths: &mut HashMap<String, SignalHandle>) -> HierarchyEntry {
    let mut children = Vec::new();
    for item in items {
        match item {
            ScopeItem::Scope(scope) => {
                let name = scope.identifier.clone();
                let next_prefix = if path_prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{path_prefix}.{name}")
                };
                children.push(build_hierarchy(&scope.children, &next_prefix, paths));
            }
            ScopeItem::Var(var) => {
                let name = var.reference.clone();
                let full_path = if path_prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{path_prefix}.{name}")
                };
                let handle = id_code_to_handle(var.code);
                paths.insert(full_path, handle);
                children.push(HierarchyEntry::Variable {
                    name,
                    handle,
                    bit_width: var.size,
                });
            }
        }
    }
    HierarchyEntry::Scope {
        name: path_prefix.rsplit('.').next().unwrap_or(path_prefix).to_string(),
        children,
    }
}

fn id_code_to_handle(code: IdCode) -> SignalHandle {
    // IdCode's Display renders VCD's base-94 identifier; hashing the string
    // gives a stable, collision-free handle without needing vcd's internal
    // integer representation.
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    code.to_string().hash(&mut hasher);
    hasher.finish()
}

/// Parses a VCD file in full, synchronously. Wrapped by [`crate::worker`]
/// for the off-main-thread load + progress reporting.
pub fn load_vcd_file(path: &Path) -> WaveScoutResult<VcdWaveform> {
    let file = File::open(path).map_err(|e| {
        WaveScoutError::Input(InputError::FileNotFound(format!("{}: {e}", path.display())))
    })?;
    let mut reader = BufReader::new(file);
    let mut source = String::new();
    reader
        .read_to_string(&mut source)
        .map_err(|e| WaveScoutError::Resource(e.into()))?;

    let mut parser = Parser::new(source.as_bytes());
    let header = parser
        .parse_header()
        .map_err(|e| WaveScoutError::VcdParse(e.to_string()))?;

    let mut paths = HashMap::new();
    let hierarchy = build_hierarchy(&header.items, "", &mut paths);

    let mut by_handle: HashMap<SignalHandle, SignalTrack> = HashMap::new();
    for (_, handle) in paths.iter() {
        by_handle.entry(*handle).or_insert_with(|| SignalTrack {
            bit_width: 1,
            transitions: Vec::new(),
        });
    }
    // Fill in the declared bit widths now that the hierarchy is built.
    fill_bit_widths(&hierarchy, &mut by_handle);

    let timescale = header
        .timescale
        .map(|(factor, unit)| Timescale {
            factor: factor as i32,
            unit: vcd_unit_to_time_unit(unit),
        })
        .unwrap_or_default();

    let mut current_time: Time = 0;
    let mut max_time: Time = 0;

    for command in parser {
        let command = command.map_err(|e| WaveScoutError::VcdParse(e.to_string()))?;
        match command {
            Command::Timestamp(t) => {
                current_time = t as Time;
                if current_time > max_time {
                    max_time = current_time;
                }
            }
            Command::ChangeScalar(code, value) => {
                let handle = id_code_to_handle(code);
                push_transition(&mut by_handle, handle, current_time, scalar_to_raw(value));
            }
            Command::ChangeVector(code, bits) => {
                let handle = id_code_to_handle(code);
                push_transition(&mut by_handle, handle, current_time, bits_to_raw(&bits));
            }
            Command::ChangeReal(code, value) => {
                let handle = id_code_to_handle(code);
                push_transition(&mut by_handle, handle, current_time, RawValue::Real(value));
            }
            Command::ChangeString(code, value) => {
                let handle = id_code_to_handle(code);
                push_transition(&mut by_handle, handle, current_time, RawValue::Literal(value));
            }
            _ => {}
        }
    }

    Ok(VcdWaveform {
        hierarchy,
        by_handle,
        paths,
        max_time,
        timescale,
    })
}

fn fill_bit_widths(entry: &HierarchyEntry, by_handle: &mut HashMap<SignalHandle, SignalTrack>) {
    match entry {
        HierarchyEntry::Variable { handle, bit_width, .. } => {
            if let Some(track) = by_handle.get_mut(handle) {
                track.bit_width = *bit_width;
            }
        }
        HierarchyEntry::Scope { children, .. } => {
            for child in children {
                fill_bit_widths(child, by_handle);
            }
        }
    }
}

fn push_transition(
    by_handle: &mut HashMap<SignalHandle, SignalTrack>,
    handle: SignalHandle,
    time: Time,
    value: RawValue,
) {
    let track = by_handle.entry(handle).or_insert_with(|| SignalTrack {
        bit_width: 1,
        transitions: Vec::new(),
    });
    if let Some(last) = track.transitions.last() {
        if last.0 == time {
            track.transitions.pop();
        }
    }
    track.transitions.push((time, value));
}

impl WaveformBackend for VcdWaveform {
    fn hierarchy(&self) -> &HierarchyEntry {
        &self.hierarchy
    }

    fn find_handle_by_path(&self, path: &str) -> Option<SignalHandle> {
        self.paths.get(path).copied()
    }

    fn bit_width(&self, handle: SignalHandle) -> Option<u32> {
        self.by_handle.get(&handle).map(|t| t.bit_width)
    }

    fn query_signal(&self, handle: SignalHandle, time: Time) -> WaveScoutResult<SignalQueryResult> {
        let track = self
            .by_handle
            .get(&handle)
            .ok_or_else(|| WaveScoutError::Data(DataError::UnknownHandle(handle)))?;
        if track.transitions.is_empty() {
            return Ok(SignalQueryResult {
                value: RawValue::Undefined,
                next_time: None,
            });
        }
        // Binary search for the last transition at or before `time`.
        let idx = match track.transitions.binary_search_by_key(&time, |(t, _)| *t) {
            Ok(i) => i,
            Err(0) => {
                // time precedes the first transition: value is undefined
                return Ok(SignalQueryResult {
                    value: RawValue::Undefined,
                    next_time: Some(track.transitions[0].0),
                });
            }
            Err(i) => i - 1,
        };
        let value = track.transitions[idx].1.clone();
        let next_time = track.transitions.get(idx + 1).map(|(t, _)| *t);
        Ok(SignalQueryResult { value, next_time })
    }

    fn transitions(&self, handle: SignalHandle, start: Time, end: Time) -> WaveScoutResult<Vec<Transition>> {
        let track = self
            .by_handle
            .get(&handle)
            .ok_or_else(|| WaveScoutError::Data(DataError::UnknownHandle(handle)))?;
        Ok(track
            .transitions
            .iter()
            .filter(|(t, _)| *t >= start && *t <= end)
            .map(|(t, v)| Transition { time: *t, value: v.clone() })
            .collect())
    }

    fn max_time(&self) -> Time {
        self.max_time
    }

    fn timescale(&self) -> Timescale {
        self.timescale
    }

    fn time_table(&self) -> Vec<Time> {
        let mut times: Vec<Time> = self
            .by_handle
            .values()
            .flat_map(|track| track.transitions.iter().map(|(t, _)| *t))
            .collect();
        times.sort_unstable();
        times.dedup();
        times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sample_vcd(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("sample.vcd");
        let mut f = File::create(&path).unwrap();
        write!(
            f,
            "$timescale 1ns $end\n\
             $scope module top $end\n\
             $var wire 1 ! clk $end\n\
             $var wire 8 \" data $end\n\
             $upscope $end\n\
             $enddefinitions $end\n\
             #0\n\
             0!\n\
             b00000000 \"\n\
             #10\n\
             1!\n\
             b00000001 \"\n\
             #20\n\
             0!\n"
        )
        .unwrap();
        path
    }

    #[test]
    fn parses_scalar_and_vector_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample_vcd(dir.path());
        let waveform = load_vcd_file(&path).unwrap();
        let clk = waveform.find_handle_by_path("top.clk").unwrap();
        let result = waveform.query_signal(clk, 10).unwrap();
        assert_eq!(result.value, RawValue::Bits(1, 1));
        assert_eq!(waveform.max_time(), 20);
    }

    #[test]
    fn query_before_first_transition_is_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample_vcd(dir.path());
        let waveform = load_vcd_file(&path).unwrap();
        let data = waveform.find_handle_by_path("top.data").unwrap();
        assert_eq!(waveform.bit_width(data), Some(8));
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = load_vcd_file(Path::new("/does/not/exist.vcd")).unwrap_err();
        assert!(matches!(err, WaveScoutError::Input(InputError::FileNotFound(_))));
    }
}
