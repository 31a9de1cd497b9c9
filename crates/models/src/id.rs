/// Id is a 16-byte opaque ULID, used for accounts, hubs, services (externally)
/// and management clients. It is the Rust equivalent of the storage layer's
/// `bytea` columns that hold raw ULID bytes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id([u8; 16]);

impl Id {
    pub fn new(b: [u8; 16]) -> Self {
        Self(b)
    }

    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn from_hex<T: AsRef<[u8]>>(hex: T) -> Result<Self, hex::FromHexError> {
        let vec_bytes = hex::decode(hex)?;
        let exact: [u8; 16] = vec_bytes
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Id(exact))
    }

    pub fn as_ulid(&self) -> ulid::Ulid {
        ulid::Ulid::from_bytes(self.0)
    }
}

impl From<ulid::Ulid> for Id {
    fn from(u: ulid::Ulid) -> Self {
        Id(u.to_bytes())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ulid())
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl serde::Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        format!("{self}").serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let str_val = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        let ulid = ulid::Ulid::from_string(str_val.as_ref())
            .map_err(|err| D::Error::custom(format!("invalid id: {err}")))?;
        Ok(Id(ulid.to_bytes()))
    }
}

#[cfg(feature = "sqlx-support")]
mod sqlx_support {
    use super::Id;
    use sqlx::{postgres, Decode, Encode, Type, TypeInfo};

    impl Type<postgres::Postgres> for Id {
        fn type_info() -> postgres::PgTypeInfo {
            postgres::PgTypeInfo::with_name("bytea")
        }
        fn compatible(ty: &postgres::PgTypeInfo) -> bool {
            ty.name() == "BYTEA"
        }
    }

    impl sqlx::postgres::PgHasArrayType for Id {
        fn array_type_info() -> postgres::PgTypeInfo {
            postgres::PgTypeInfo::with_name("_bytea")
        }
    }

    impl Encode<'_, postgres::Postgres> for Id {
        fn encode_by_ref(
            &self,
            buf: &mut postgres::PgArgumentBuffer,
        ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
            buf.extend_from_slice(&self.0);
            Ok(sqlx::encode::IsNull::No)
        }
    }

    impl Decode<'_, postgres::Postgres> for Id {
        fn decode(value: postgres::PgValueRef<'_>) -> Result<Self, sqlx::error::BoxDynError> {
            let bytes = <&[u8] as Decode<'_, postgres::Postgres>>::decode(value)?;
            let exact: [u8; 16] = bytes
                .try_into()
                .map_err(|_| "id column did not contain 16 bytes")?;
            Ok(Id(exact))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_hex_round_trip() {
        let id = Id::generate();
        let hex = hex::encode(id.as_bytes());
        let decoded = Id::from_hex(&hex).unwrap();
        assert_eq!(id, decoded);
    }

    #[test]
    fn serde_round_trip() {
        let id = Id::generate();
        let json = serde_json::to_string(&id).unwrap();
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
