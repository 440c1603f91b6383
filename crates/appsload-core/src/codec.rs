//! Binary payload encoding — wraps the `prost`-generated [`UserApps`] message

use prost::Message;

use crate::record::Record;

/// Generated from `proto/appsinstalled.proto` by `build.rs`.
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/appsload.rs"));
}

pub use proto::UserApps;

/// A record after binary encoding, ready to be written to memcached.
#[derive(Debug, Clone)]
pub struct EncodedRecord {
    pub key: String,
    pub payload: Vec<u8>,
    pub debug_form: String,
}

/// Encode a [`Record`] into its memcached key and binary payload.
pub fn encode(record: &Record) -> EncodedRecord {
    let key = format!("{}:{}", record.device_type, record.device_id);
    let message = UserApps {
        lat: record.lat,
        lon: record.lon,
        apps: record.apps.clone(),
    };
    let payload = message.encode_to_vec();
    let debug_form = format!("{key} -> {message:?}");

    EncodedRecord {
        key,
        payload,
        debug_form,
    }
}

/// Decode a payload back into a [`UserApps`] message.
pub fn decode(payload: &[u8]) -> Result<UserApps, prost::DecodeError> {
    UserApps::decode(payload)
}

/// Self-check that encode∘decode is the identity on lat/lon/apps.
///
/// Backs the `-t/--test` CLI flag.
pub fn self_test() -> Result<(), String> {
    let samples = [
        Record {
            device_type: "idfa".to_string(),
            device_id: "1rfw452y52g2gq4g".to_string(),
            lat: 55.55,
            lon: 42.42,
            apps: vec![1423, 43, 567, 3, 7, 23],
        },
        Record {
            device_type: "gaid".to_string(),
            device_id: "7rfw452y52g2gq4g".to_string(),
            lat: 55.55,
            lon: 42.42,
            apps: vec![7423, 424],
        },
        Record {
            device_type: "adid".to_string(),
            device_id: "empty-apps".to_string(),
            lat: 0.0,
            lon: 0.0,
            apps: vec![],
        },
    ];

    for record in &samples {
        let encoded = encode(record);
        let decoded = decode(&encoded.payload).map_err(|e| format!("decode failed: {e}"))?;
        if decoded.lat != record.lat || decoded.lon != record.lon || decoded.apps != record.apps {
            return Err(format!(
                "round-trip mismatch for {}: got {decoded:?}",
                encoded.key
            ));
        }
    }
    Ok(())
}
