//! `serde` adapters for the arkworks types used throughout the data model.
//!
//! Arkworks types implement `CanonicalSerialize`/`CanonicalDeserialize`, not
//! `serde::Serialize`; these modules bridge the two for the canonical CBOR
//! encoding [`crate`] entities are persisted with.

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sequencer_crypto::{Ciphertext, Fr, Point};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod fr {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        let mut bytes = Vec::new();
        value
            .serialize_compressed(&mut bytes)
            .map_err(serde::ser::Error::custom)?;
        bytes.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Fr::deserialize_compressed(&bytes[..]).map_err(serde::de::Error::custom)
    }
}

pub mod point {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        let mut bytes = Vec::new();
        value
            .serialize_compressed(&mut bytes)
            .map_err(serde::ser::Error::custom)?;
        bytes.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Point::deserialize_compressed(&bytes[..]).map_err(serde::de::Error::custom)
    }
}

#[derive(Serialize, Deserialize)]
struct RawCiphertext {
    c1: Vec<u8>,
    c2: Vec<u8>,
}

pub mod ciphertext {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Ciphertext, serializer: S) -> Result<S::Ok, S::Error> {
        to_raw(value)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Ciphertext, D::Error> {
        let raw = RawCiphertext::deserialize(deserializer)?;
        from_raw(raw).map_err(serde::de::Error::custom)
    }
}

pub mod ciphertext_vec {
    use super::*;

    pub fn serialize<S: Serializer>(
        fields: &[Ciphertext],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let raw: Result<Vec<RawCiphertext>, _> = fields.iter().map(to_raw).collect();
        raw.map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Ciphertext>, D::Error> {
        let raw = Vec::<RawCiphertext>::deserialize(deserializer)?;
        raw.into_iter()
            .map(from_raw)
            .collect::<Result<Vec<_>, _>>()
            .map_err(serde::de::Error::custom)
    }
}

fn to_raw(ct: &Ciphertext) -> Result<RawCiphertext, ark_serialize::SerializationError> {
    let mut c1 = Vec::new();
    let mut c2 = Vec::new();
    ct.c1.serialize_compressed(&mut c1)?;
    ct.c2.serialize_compressed(&mut c2)?;
    Ok(RawCiphertext { c1, c2 })
}

fn from_raw(raw: RawCiphertext) -> Result<Ciphertext, ark_serialize::SerializationError> {
    Ok(Ciphertext {
        c1: Point::deserialize_compressed(&raw.c1[..])?,
        c2: Point::deserialize_compressed(&raw.c2[..])?,
    })
}
