use std::fmt;
use std::str::FromStr;

/// Id is an opaque entity identifier. It's a thin wrapper over a UUID so
/// that call sites can't accidentally mix up a clip id and a source id,
/// while the wire representation (and the `TEXT` column it's stored in on
/// both dialects) is just an opaque string.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(uuid::Uuid);

impl Id {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(u: uuid::Uuid) -> Self {
        Self(u)
    }

    pub fn as_uuid(&self) -> uuid::Uuid {
        self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

impl serde::Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let s = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        Id::from_str(s.as_ref()).map_err(|err| D::Error::custom(format!("invalid id: {err}")))
    }
}

/// IdGenerator hands out fresh [`Id`]s. It's a thin seam so that tests can
/// substitute a deterministic generator; production always uses `Id::new`.
pub trait IdGenerator: Send + Sync {
    fn next(&self) -> Id;
}

#[derive(Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next(&self) -> Id {
        Id::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let id = Id::new();
        let s = id.to_string();
        assert_eq!(Id::from_str(&s).unwrap(), id);
    }

    #[test]
    fn json_round_trip() {
        let id = Id::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-uuid".parse::<Id>().is_err());
    }
}
