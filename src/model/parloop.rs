//! Loops and their access descriptors.

use crate::utils::errors::{ConfigurationError, ConfigurationErrorKind};
use crate::utils::sanitize::sanitize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keyword the runtime uses for direct (map-free) access.
pub const DIRECT: &str = "DIRECT";

/// How a loop touches a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    /// Read only
    #[serde(rename = "READ")]
    Read,
    /// Write only
    #[serde(rename = "WRITE")]
    Write,
    /// Read and write
    #[serde(rename = "RW")]
    ReadWrite,
    /// Increment (commutative update)
    #[serde(rename = "INC")]
    Increment,
}

impl AccessMode {
    /// Name of the runtime's `am_t` enumerator.
    pub fn as_runtime(&self) -> &'static str {
        match self {
            AccessMode::Read => "READ",
            AccessMode::Write => "WRITE",
            AccessMode::ReadWrite => "RW",
            AccessMode::Increment => "INC",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_runtime())
    }
}

impl FromStr for AccessMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ" => Ok(AccessMode::Read),
            "WRITE" => Ok(AccessMode::Write),
            "RW" | "READ_WRITE" => Ok(AccessMode::ReadWrite),
            "INC" | "INCREMENT" => Ok(AccessMode::Increment),
            _ => Err(ConfigurationError::new(
                ConfigurationErrorKind::InvalidValue,
                format!("unknown access mode `{}` (expected READ, WRITE, RW or INC)", s),
            )),
        }
    }
}

/// Either a named map or direct access to the iteration set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MapRef {
    /// No indirection
    Direct,
    /// Access through the named map
    Map(String),
}

impl MapRef {
    /// Reference a map by (unsanitized) name; `DIRECT` maps to [`MapRef::Direct`].
    pub fn named(name: &str) -> Self {
        if name == DIRECT {
            MapRef::Direct
        } else {
            MapRef::Map(sanitize(name))
        }
    }

    /// True for direct access.
    pub fn is_direct(&self) -> bool {
        matches!(self, MapRef::Direct)
    }

    /// Map name, unless direct.
    pub fn map_name(&self) -> Option<&str> {
        match self {
            MapRef::Direct => None,
            MapRef::Map(name) => Some(name),
        }
    }

    /// Name as written in emitted code.
    pub fn as_str(&self) -> &str {
        match self {
            MapRef::Direct => DIRECT,
            MapRef::Map(name) => name,
        }
    }
}

impl From<String> for MapRef {
    fn from(s: String) -> Self {
        MapRef::named(&s)
    }
}

impl From<MapRef> for String {
    fn from(m: MapRef) -> Self {
        m.as_str().to_string()
    }
}

impl fmt::Display for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (map-or-DIRECT, access mode) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    /// Map through which the data is reached
    pub map: MapRef,
    /// Access mode
    pub mode: AccessMode,
}

impl Descriptor {
    /// Access through the map `map` (sanitized); `DIRECT` is recognized.
    pub fn new(map: &str, mode: AccessMode) -> Self {
        Self { map: MapRef::named(map), mode }
    }

    /// Direct access to the iteration set.
    pub fn direct(mode: AccessMode) -> Self {
        Self { map: MapRef::Direct, mode }
    }
}

/// One parallel loop of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loop {
    /// Loop (kernel) name; may repeat along the chain
    pub name: String,
    /// Iteration set name
    pub set: String,
    /// Access descriptors in kernel-argument order
    pub descriptors: Vec<Descriptor>,
}

impl Loop {
    /// A loop over `set`; names are sanitized when the loop is declared.
    pub fn new(name: &str, set: &str, descriptors: Vec<Descriptor>) -> Self {
        Self {
            name: name.to_string(),
            set: set.to_string(),
            descriptors,
        }
    }

    pub(crate) fn sanitized(self) -> Self {
        Self {
            name: sanitize(&self.name),
            set: sanitize(&self.set),
            descriptors: self
                .descriptors
                .into_iter()
                .map(|d| Descriptor {
                    map: match d.map {
                        MapRef::Direct => MapRef::Direct,
                        MapRef::Map(name) => MapRef::named(&name),
                    },
                    mode: d.mode,
                })
                .collect(),
        }
    }

    /// Distinct indirect maps, in order of first use.
    pub fn indirect_maps(&self) -> Vec<&str> {
        let mut maps: Vec<&str> = Vec::new();
        for name in self.descriptors.iter().filter_map(|d| d.map.map_name()) {
            if !maps.contains(&name) {
                maps.push(name);
            }
        }
        maps
    }

    /// Identifier the runtime knows this loop by, e.g. `flux_Loop_0`.
    pub fn runtime_name(&self, ordinal: usize) -> String {
        format!("{}_Loop_{}", self.name, ordinal)
    }

    /// Identifier of the emitted descriptor list, e.g. `flux_Desc_0`.
    pub fn desc_list_name(&self, ordinal: usize) -> String {
        format!("{}_Desc_{}", self.name, ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_parse() {
        assert_eq!("rw".parse::<AccessMode>().unwrap(), AccessMode::ReadWrite);
        assert_eq!("INC".parse::<AccessMode>().unwrap(), AccessMode::Increment);
        assert!("MIN".parse::<AccessMode>().is_err());
    }

    #[test]
    fn test_direct_keyword() {
        assert!(MapRef::named("DIRECT").is_direct());
        assert_eq!(MapRef::named("pkg.edge2node"), MapRef::Map("edge2node".into()));
    }

    #[test]
    fn test_indirect_maps_dedup() {
        let l = Loop::new(
            "res_calc",
            "edges",
            vec![
                Descriptor::new("edge2node", AccessMode::Read),
                Descriptor::direct(AccessMode::Read),
                Descriptor::new("edge2cell", AccessMode::Increment),
                Descriptor::new("edge2node", AccessMode::Read),
            ],
        );
        assert_eq!(l.indirect_maps(), vec!["edge2node", "edge2cell"]);
        assert_eq!(l.runtime_name(3), "res_calc_Loop_3");
        assert_eq!(l.desc_list_name(3), "res_calc_Desc_3");
    }

    #[test]
    fn test_descriptor_serde() {
        let d: Descriptor = serde_json::from_str(r#"{"map": "DIRECT", "mode": "WRITE"}"#).unwrap();
        assert_eq!(d, Descriptor::direct(AccessMode::Write));
    }
}
