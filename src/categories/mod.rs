//! Static category tables: destination-port→service lookup and the
//! priority-ordered TCP flag/state decision tables.

mod flag;
mod service;

pub use flag::{FlagTable, FlagToken, TcpFlags};
pub use service::{resolve_service, service_for_port, ICMP_SERVICE, SERVICE_OTHER};
