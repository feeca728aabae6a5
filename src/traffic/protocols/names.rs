use std::fmt::{self, Display};

use serde::Serialize;

use crate::traffic::Settings;

pub const LEVELS: usize = Settings::STACK_SIZE + 1;

/// Protocol names recognized for one packet, one per stack level.
///
/// Levels `1..=STACK_SIZE` go from the outermost encapsulation inwards
/// (e.g. `ETH_II`, `IP`, `TCP`, `HTTP`). Level 0 is the topmost recognized
/// protocol: a copy of the highest level that is not `UNKNOWN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolNames {
    levels: [String; LEVELS],
}

impl ProtocolNames {
    /// Builds the names from a decoder stack, outermost first. Extra levels
    /// past `STACK_SIZE` are dropped; empty names become `UNKNOWN`.
    pub fn from_stack<S: AsRef<str>>(stack: &[S]) -> Self {
        let mut levels: [String; LEVELS] = Default::default();
        for (level, slot) in levels.iter_mut().enumerate().skip(1) {
            *slot = normalize(stack.get(level - 1).map(|s| s.as_ref()));
        }
        levels[0] = topmost(&levels);
        ProtocolNames { levels }
    }

    pub fn unknown() -> Self {
        Self::from_stack::<&str>(&[])
    }

    pub fn level(&self, level: usize) -> &str {
        &self.levels[level]
    }

    pub fn topmost(&self) -> &str {
        &self.levels[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.levels.iter().map(|s| s.as_str()).enumerate()
    }
}

fn normalize(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => Settings::UNKNOWN_PROTOCOL.to_string(),
    }
}

fn topmost(levels: &[String; LEVELS]) -> String {
    levels[1..]
        .iter()
        .rev()
        .find(|name| name.as_str() != Settings::UNKNOWN_PROTOCOL)
        .cloned()
        .unwrap_or_else(|| Settings::UNKNOWN_PROTOCOL.to_string())
}

impl Display for ProtocolNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<&str> = self.levels[1..]
            .iter()
            .map(|s| s.as_str())
            .filter(|s| *s != Settings::UNKNOWN_PROTOCOL)
            .collect();
        if known.is_empty() {
            write!(f, "{}", Settings::UNKNOWN_PROTOCOL)
        } else {
            write!(f, "{}", known.join("/"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stack_fills_levels() {
        let names = ProtocolNames::from_stack(&["ETH_II", "IP", "TCP", "HTTP"]);
        assert_eq!(names.level(1), "ETH_II");
        assert_eq!(names.level(4), "HTTP");
        assert_eq!(names.level(5), "UNKNOWN");
        assert_eq!(names.topmost(), "HTTP");
        assert_eq!(names.to_string(), "ETH_II/IP/TCP/HTTP");
    }

    #[test]
    fn test_empty_level_is_unknown() {
        let names = ProtocolNames::from_stack(&["ETH_II", "", "UDP"]);
        assert_eq!(names.level(2), "UNKNOWN");
        assert_eq!(names.topmost(), "UDP");
    }

    #[test]
    fn test_nothing_known() {
        let names = ProtocolNames::unknown();
        assert!(names.iter().all(|(_, n)| n == "UNKNOWN"));
        assert_eq!(names.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_extra_levels_dropped() {
        let names = ProtocolNames::from_stack(&["A", "B", "C", "D", "E", "F"]);
        assert_eq!(names.level(5), "E");
        assert_eq!(names.topmost(), "E");
    }
}
