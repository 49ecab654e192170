use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_newtype!(WorkerId);
id_newtype!(GameServerId);
id_newtype!(GameServerConfigId);
id_newtype!(GameServerInstanceId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_the_raw_integer() {
        assert_eq!(WorkerId::new(42).to_string(), "42");
    }

    #[test]
    fn ids_of_different_entities_do_not_compare_equal_by_type() {
        let worker = WorkerId::new(1);
        let server = GameServerId::new(1);
        assert_eq!(worker.get(), server.get());
    }
}
