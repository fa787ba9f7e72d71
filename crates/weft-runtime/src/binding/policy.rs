//! Selection policies for lazy resolution.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use weft_component::Binding;

/// Per-port attribute that overrides the engine's default policy.
pub const POLICY_ATTRIBUTE: &str = "policy";

/// How a required port orders its live bindings.
///
/// | Policy | Order |
/// |--------|-------|
/// | `priority` | highest priority first, then insertion order |
/// | `first` | insertion order |
/// | `round_robin` | insertion order, rotated by one on every call |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Highest priority wins; ties go to the earliest binding.
    #[default]
    Priority,
    /// Earliest binding wins.
    First,
    /// Rotates through bindings in insertion order.
    RoundRobin,
}

impl SelectionPolicy {
    /// Sorts bindings into this policy's base order.
    ///
    /// Rotation for [`SelectionPolicy::RoundRobin`] is applied by the
    /// resolver, which owns the per-port cursor.
    pub fn sort<T>(self, items: &mut [T], binding: impl Fn(&T) -> &Binding) {
        match self {
            Self::Priority => items.sort_by(|a, b| {
                let (a, b) = (binding(a), binding(b));
                b.priority().cmp(&a.priority()).then(a.seq().cmp(&b.seq()))
            }),
            Self::First | Self::RoundRobin => items.sort_by_key(|i| binding(i).seq()),
        }
    }

    /// Name used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::First => "first",
            Self::RoundRobin => "round_robin",
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "priority" => Ok(Self::Priority),
            "first" => Ok(Self::First),
            "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            other => Err(format!(
                "unknown selection policy '{other}' (expected priority, first or round_robin)"
            )),
        }
    }
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_component::{BindOptions, BindingKind, Resolution};
    use weft_types::PortId;

    fn binding(priority: i32, seq: u64) -> Binding {
        Binding::new(
            PortId::new(),
            PortId::new(),
            BindOptions::new(BindingKind::Local, Resolution::Lazy).with_priority(priority),
            seq,
        )
    }

    #[test]
    fn priority_then_insertion() {
        let mut items = vec![binding(100, 0), binding(200, 1), binding(200, 2), binding(50, 3)];
        SelectionPolicy::Priority.sort(&mut items, |b| b);
        let seqs: Vec<u64> = items.iter().map(Binding::seq).collect();
        assert_eq!(seqs, vec![1, 2, 0, 3]);
    }

    #[test]
    fn first_ignores_priority() {
        let mut items = vec![binding(1, 2), binding(999, 0), binding(5, 1)];
        SelectionPolicy::First.sort(&mut items, |b| b);
        let seqs: Vec<u64> = items.iter().map(Binding::seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn parse_names() {
        assert_eq!("priority".parse::<SelectionPolicy>(), Ok(SelectionPolicy::Priority));
        assert_eq!("Round-Robin".parse::<SelectionPolicy>(), Ok(SelectionPolicy::RoundRobin));
        assert_eq!("first".parse::<SelectionPolicy>(), Ok(SelectionPolicy::First));
        assert!("random".parse::<SelectionPolicy>().is_err());
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&SelectionPolicy::RoundRobin).unwrap();
        assert_eq!(json, "\"round_robin\"");
    }
}
