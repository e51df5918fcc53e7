use std::net::IpAddr;

use regex::Regex;

lazy_static! {
    /// Cheap structural check run before handing a value to the address parser.
    static ref IP_ADDRESS: Regex = Regex::new(
        r"^(?:(?:[0-9]{1,3}\.){3}[0-9]{1,3}|[0-9A-Fa-f]{0,4}:[0-9A-Fa-f:.]*)$"
    )
    .expect("IP address regex invalid");
}

pub(super) fn parse(s: &str) -> Option<IpAddr> {
    if !IP_ADDRESS.is_match(s) {
        return None;
    }
    s.parse().ok()
}
