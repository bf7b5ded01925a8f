/// Serde adapter for optional persisted overrides.
///
/// The stored maps spell an absent override as `false` rather than `null`,
/// so `None` round-trips through that token. `null` and a missing field are
/// accepted on input as well.
pub mod false_as_none {
    use serde::de::{self, Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Repr<T> {
        Flag(bool),
        Value(T),
    }

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        match Option::<Repr<T>>::deserialize(deserializer)? {
            None | Some(Repr::Flag(false)) => Ok(None),
            Some(Repr::Flag(true)) => Err(de::Error::custom("expected `false` or a value")),
            Some(Repr::Value(v)) => Ok(Some(v)),
        }
    }
}
