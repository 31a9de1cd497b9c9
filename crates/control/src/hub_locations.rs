/// The storage form of a hub's `connection_info` blob (§3: "opaque
/// `connection_info` blob"): JSON-encoded network locations, matching the
/// repo-wide convention of JSON for anything stored as an opaque byte
/// column (the activity log's `event` column uses the same convention).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct StoredLocation {
    address: String,
    port: u32,
}

pub fn encode(locations: &[proto::NetworkLocation]) -> Vec<u8> {
    let stored: Vec<StoredLocation> = locations
        .iter()
        .map(|l| StoredLocation {
            address: l.address.clone(),
            port: l.port,
        })
        .collect();
    serde_json::to_vec(&stored).unwrap_or_default()
}

pub fn decode(blob: &[u8]) -> Vec<proto::NetworkLocation> {
    serde_json::from_slice::<Vec<StoredLocation>>(blob)
        .unwrap_or_default()
        .into_iter()
        .map(|l| proto::NetworkLocation {
            address: l.address,
            port: l.port,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_locations() {
        let locations = vec![proto::NetworkLocation {
            address: "10.0.0.1".to_string(),
            port: 7777,
        }];
        let encoded = encode(&locations);
        assert_eq!(decode(&encoded), locations);
    }

    #[test]
    fn malformed_blob_decodes_to_empty() {
        assert!(decode(b"not json").is_empty());
    }
}
