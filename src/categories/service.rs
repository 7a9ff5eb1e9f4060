//! Destination-port→service token table. Exact match over a closed set;
//! anything else maps to `"other"`. ICMP traffic bypasses the port lookup
//! entirely and is labeled with a fixed token.

/// Fallback token for ports outside the table (and events without a port).
pub const SERVICE_OTHER: &str = "other";

/// Fixed token substituted whenever the event protocol is ICMP.
pub const ICMP_SERVICE: &str = "ecr_i";

/// Service token for a destination port.
pub fn service_for_port(port: u16) -> &'static str {
    match port {
        7 => "echo",
        9 => "discard",
        11 => "systat",
        13 => "daytime",
        15 => "netstat",
        20 => "ftp_data",
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        37 => "time",
        42 => "name",
        43 => "whois",
        53 => "domain",
        57 => "mtp",
        67 => "urh_i",
        68 => "urp_i",
        69 => "tftp_u",
        70 => "gopher",
        77 => "rje",
        79 => "finger",
        80 => "http",
        84 => "ctf",
        87 => "link",
        95 => "supdup",
        102 => "iso_tsap",
        105 => "csnet_ns",
        109 => "pop_2",
        110 => "pop_3",
        111 => "sunrpc",
        113 => "auth",
        119 => "nntp",
        123 => "ntp_u",
        137 => "netbios_ns",
        138 => "netbios_dgm",
        139 => "netbios_ssn",
        143 => "imap4",
        175 => "vmnet",
        179 => "bgp",
        194 => "IRC",
        210 => "Z39_50",
        389 => "ldap",
        433 => "nnsp",
        443 => "http_443",
        512 => "exec",
        513 => "login",
        514 => "shell",
        515 => "printer",
        520 => "efs",
        530 => "courier",
        540 => "uucp",
        543 => "klogin",
        544 => "kshell",
        1521 => "sql_net",
        2784 => "http_2784",
        4045 => "pm_dump",
        5190 => "aol",
        6000 => "X11",
        8001 => "http_8001",
        9999 => "private",
        _ => SERVICE_OTHER,
    }
}

/// Resolve the service token for one event: ICMP override first, then the
/// port table, then the fallback when no destination port is present.
pub fn resolve_service(dest_port: Option<u16>, proto: Option<&str>) -> &'static str {
    if proto == Some("ICMP") {
        return ICMP_SERVICE;
    }
    match dest_port {
        Some(port) => service_for_port(port),
        None => SERVICE_OTHER,
    }
}
