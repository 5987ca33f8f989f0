use core::fmt;

use serde::de::{self, MapAccess};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How many unreachable nodes of the original chain make a majority outage.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MajorityRule {
    /// `floor(N / 2) + 1` unreachable nodes.
    #[default]
    Majority,

    /// A fixed number of unreachable nodes.
    Unreachable(usize),
}

impl MajorityRule {
    /// Minimum number of unreachable nodes, out of `total`, that counts as an outage.
    ///
    /// Never returns zero, so that a fully healthy chain is never an outage.
    pub fn threshold(&self, total: usize) -> usize {
        match self {
            Self::Majority => total / 2 + 1,
            Self::Unreachable(k) => (*k).max(1),
        }
    }
}

impl fmt::Display for MajorityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Majority => f.write_str("majority"),
            Self::Unreachable(k) => write!(f, "{k} unreachable"),
        }
    }
}

impl Serialize for MajorityRule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Majority => serializer.serialize_str("majority"),
            Self::Unreachable(k) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("unreachable", k)?;
                map.end()
            }
        }
    }
}

/// Accepts `"majority"`, `{ unreachable = k }`, or a bare integer `k`
/// (also as a string, as environment overrides produce).
impl<'de> Deserialize<'de> for MajorityRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MajorityRuleVisitor;

        impl<'de> de::Visitor<'de> for MajorityRuleVisitor {
            type Value = MajorityRule;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "\"majority\", an integer or a table with an `unreachable` key"
                )
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                usize::try_from(v)
                    .map(MajorityRule::Unreachable)
                    .map_err(|_| E::custom(format!("u64 value {v} out of range for usize")))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                usize::try_from(v)
                    .map(MajorityRule::Unreachable)
                    .map_err(|_| E::custom(format!("i64 value {v} out of range for usize")))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v.eq_ignore_ascii_case("majority") {
                    return Ok(MajorityRule::Majority);
                }

                v.parse::<usize>()
                    .map(MajorityRule::Unreachable)
                    .map_err(|_| E::custom(format!("invalid majority rule: {v}")))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut unreachable = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "unreachable" => unreachable = Some(map.next_value::<usize>()?),
                        other => return Err(de::Error::unknown_field(other, &["unreachable"])),
                    }
                }

                unreachable
                    .map(MajorityRule::Unreachable)
                    .ok_or_else(|| de::Error::missing_field("unreachable"))
            }
        }

        deserializer.deserialize_any(MajorityRuleVisitor)
    }
}
