//! Line parsing: turn one raw TSV line into a [`Record`] or a rejection

use crate::routing::DeviceType;

/// A validated 5-field input row. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub device_type: String,
    pub device_id: String,
    pub lat: f64,
    pub lon: f64,
    pub apps: Vec<u32>,
}

/// Result of attempting to parse one line.
#[derive(Debug, PartialEq)]
pub enum ParseOutcome {
    /// Line was blank after trimming; not counted as an error.
    Empty,
    /// Successfully parsed record.
    Record(Record),
    /// Line was structurally malformed; counts as a file-level error.
    Malformed,
}

/// Parse one raw line of a gzip-decompressed TSV stream.
pub fn parse_line(line: &str) -> ParseOutcome {
    let line = line.trim_end();
    if line.is_empty() {
        return ParseOutcome::Empty;
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 5 {
        return ParseOutcome::Malformed;
    }

    let device_type = fields[0];
    let device_id = fields[1];
    let raw_lat = fields[2];
    let raw_lon = fields[3];
    let raw_apps = fields[4];

    if device_type.is_empty() || device_id.is_empty() {
        return ParseOutcome::Malformed;
    }

    let apps = parse_apps(raw_apps, line);
    let lat = parse_coord(raw_lat, "lat", line);
    let lon = parse_coord(raw_lon, "lon", line);

    ParseOutcome::Record(Record {
        device_type: device_type.to_string(),
        device_id: device_id.to_string(),
        lat,
        lon,
        apps,
    })
}

/// Parse a comma-separated app-id list, falling back to a lenient pass that
/// keeps only numeric-looking tokens if strict parsing fails.
fn parse_apps(raw_apps: &str, line: &str) -> Vec<u32> {
    let strict: Result<Vec<u32>, _> = raw_apps.split(',').map(|a| a.trim().parse::<u32>()).collect();
    match strict {
        Ok(apps) => apps,
        Err(_) => {
            log::info!("not all user apps are digits: `{line}`");
            raw_apps
                .split(',')
                .map(str::trim)
                .filter_map(|a| a.parse::<u32>().ok())
                .collect()
        }
    }
}

/// Parse a single coordinate, defaulting to 0.0 and logging on failure.
fn parse_coord(raw: &str, which: &'static str, line: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            log::info!("invalid {which} `{raw}`, defaulting to 0.0: `{line}`");
            0.0
        }
    }
}

/// Parsed device_type resolved against the known routing table.
pub fn resolve_device_type(record: &Record) -> Option<DeviceType> {
    DeviceType::parse(&record.device_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_is_empty() {
        assert_eq!(parse_line(""), ParseOutcome::Empty);
        assert_eq!(parse_line("   \n"), ParseOutcome::Empty);
    }

    #[test]
    fn too_few_fields_is_malformed() {
        assert_eq!(parse_line("idfa\tabc\t1.0"), ParseOutcome::Malformed);
    }

    #[test]
    fn empty_device_type_is_malformed() {
        assert_eq!(
            parse_line("\tabc\t1.0\t2.0\t1,2"),
            ParseOutcome::Malformed
        );
    }

    #[test]
    fn empty_device_id_is_malformed() {
        assert_eq!(
            parse_line("idfa\t\t1.0\t2.0\t1,2"),
            ParseOutcome::Malformed
        );
    }

    #[test]
    fn well_formed_line_parses() {
        let outcome = parse_line("idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23");
        match outcome {
            ParseOutcome::Record(r) => {
                assert_eq!(r.device_type, "idfa");
                assert_eq!(r.device_id, "1rfw452y52g2gq4g");
                assert_eq!(r.lat, 55.55);
                assert_eq!(r.lon, 42.42);
                assert_eq!(r.apps, vec![1423, 43, 567, 3, 7, 23]);
            }
            other => panic!("expected Record, got {other:?}"),
        }
    }

    #[test]
    fn lenient_app_parsing_keeps_numeric_tokens() {
        let outcome = parse_line("idfa\tabc\t1.0\t2.0\t1,xx,3");
        match outcome {
            ParseOutcome::Record(r) => assert_eq!(r.apps, vec![1, 3]),
            other => panic!("expected Record, got {other:?}"),
        }
    }

    #[test]
    fn lenient_app_parsing_all_non_numeric_is_empty_list() {
        let outcome = parse_line("idfa\tabc\t1.0\t2.0\tfoo,bar");
        match outcome {
            ParseOutcome::Record(r) => assert!(r.apps.is_empty()),
            other => panic!("expected Record, got {other:?}"),
        }
    }

    #[test]
    fn empty_apps_list_is_valid() {
        let outcome = parse_line("idfa\tabc\t1.0\t2.0\t");
        match outcome {
            ParseOutcome::Record(r) => assert!(r.apps.is_empty()),
            other => panic!("expected Record, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_coords_default_to_zero() {
        let outcome = parse_line("idfa\tabc\tnotanumber\t2.0\t1,2");
        match outcome {
            ParseOutcome::Record(r) => {
                assert_eq!(r.lat, 0.0);
                assert_eq!(r.lon, 2.0);
            }
            other => panic!("expected Record, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_around_app_tokens_is_trimmed() {
        let outcome = parse_line("idfa\tabc\t1.0\t2.0\t 1 , 2 ,3");
        match outcome {
            ParseOutcome::Record(r) => assert_eq!(r.apps, vec![1, 2, 3]),
            other => panic!("expected Record, got {other:?}"),
        }
    }

    #[test]
    fn resolve_known_and_unknown_device_type() {
        let known = Record {
            device_type: "gaid".to_string(),
            device_id: "x".to_string(),
            lat: 0.0,
            lon: 0.0,
            apps: vec![],
        };
        assert_eq!(resolve_device_type(&known), Some(DeviceType::Gaid));

        let unknown = Record {
            device_type: "xxxx".to_string(),
            ..known
        };
        assert_eq!(resolve_device_type(&unknown), None);
    }
}
