//! Device-type routing table mapping a device type to its memcached endpoint

use crate::error::RoutingError;

/// The four known device types. Anything else is an unknown-device error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Idfa,
    Gaid,
    Adid,
    Dvid,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idfa => "idfa",
            Self::Gaid => "gaid",
            Self::Adid => "adid",
            Self::Dvid => "dvid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idfa" => Some(Self::Idfa),
            "gaid" => Some(Self::Gaid),
            "adid" => Some(Self::Adid),
            "dvid" => Some(Self::Dvid),
            _ => None,
        }
    }

    pub const ALL: [DeviceType; 4] = [Self::Idfa, Self::Gaid, Self::Adid, Self::Dvid];
}

/// Process-wide constant mapping each device type to its memcached `host:port`.
#[derive(Debug, Clone)]
pub struct DeviceRouting {
    idfa: String,
    gaid: String,
    adid: String,
    dvid: String,
}

impl DeviceRouting {
    pub fn new(idfa: String, gaid: String, adid: String, dvid: String) -> Result<Self, RoutingError> {
        for (field, value) in [
            ("idfa", &idfa),
            ("gaid", &gaid),
            ("adid", &adid),
            ("dvid", &dvid),
        ] {
            if value.rsplit_once(':').is_none() {
                return Err(RoutingError::InvalidAddress {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(Self {
            idfa,
            gaid,
            adid,
            dvid,
        })
    }

    pub fn endpoint(&self, device_type: DeviceType) -> &str {
        match device_type {
            DeviceType::Idfa => &self.idfa,
            DeviceType::Gaid => &self.gaid,
            DeviceType::Adid => &self.adid,
            DeviceType::Dvid => &self.dvid,
        }
    }
}
