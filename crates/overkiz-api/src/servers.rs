// Known Overkiz cloud endpoints.
//
// The same API is hosted by several vendors on separate gateways; the
// configuration selects one by its snake_case name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A supported Overkiz cloud server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Server {
    SomfyEurope,
    SomfyAmerica,
    SomfyOceania,
    AtlanticCozytouch,
    HiKumoEurope,
    HiKumoAsia,
    Rexel,
    Flexom,
}

impl Server {
    /// Base URL of the enduser API on this server. Always ends with `/`.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::SomfyEurope => "https://ha101-1.overkiz.com/enduser-mobile-web/enduserAPI/",
            Self::SomfyAmerica => "https://ha401-1.overkiz.com/enduser-mobile-web/enduserAPI/",
            Self::SomfyOceania => "https://ha201-1.overkiz.com/enduser-mobile-web/enduserAPI/",
            Self::AtlanticCozytouch => {
                "https://ha110-1.overkiz.com/enduser-mobile-web/enduserAPI/"
            }
            Self::HiKumoEurope => "https://ha117-1.overkiz.com/enduser-mobile-web/enduserAPI/",
            Self::HiKumoAsia => "https://ha203-1.overkiz.com/enduser-mobile-web/enduserAPI/",
            Self::Rexel => "https://ha112-1.overkiz.com/enduser-mobile-web/enduserAPI/",
            Self::Flexom => "https://ha108-1.overkiz.com/enduser-mobile-web/enduserAPI/",
        }
    }

    /// The snake_case name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Self::SomfyEurope => "somfy_europe",
            Self::SomfyAmerica => "somfy_america",
            Self::SomfyOceania => "somfy_oceania",
            Self::AtlanticCozytouch => "atlantic_cozytouch",
            Self::HiKumoEurope => "hi_kumo_europe",
            Self::HiKumoAsia => "hi_kumo_asia",
            Self::Rexel => "rexel",
            Self::Flexom => "flexom",
        }
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Server {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "somfy_europe" => Ok(Self::SomfyEurope),
            "somfy_america" => Ok(Self::SomfyAmerica),
            "somfy_oceania" => Ok(Self::SomfyOceania),
            "atlantic_cozytouch" => Ok(Self::AtlanticCozytouch),
            "hi_kumo_europe" => Ok(Self::HiKumoEurope),
            "hi_kumo_asia" => Ok(Self::HiKumoAsia),
            "rexel" => Ok(Self::Rexel),
            "flexom" => Ok(Self::Flexom),
            other => Err(format!("unknown server '{other}'")),
        }
    }
}
