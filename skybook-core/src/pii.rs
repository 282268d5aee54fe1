use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Keeps travel-document data out of `Debug`/`Display` output, so passengers can
/// be logged with `{:?}` without leaking passport numbers. Serialization still
/// writes the real value; API and storage need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(pub T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_masked_but_json_is_not() {
        let passport = Masked::new("X1234567".to_string());
        assert_eq!(format!("{:?}", passport), "********");
        assert_eq!(passport.to_string(), "********");
        assert_eq!(serde_json::to_string(&passport).unwrap(), "\"X1234567\"");
        assert_eq!(passport.expose(), "X1234567");
    }
}
