//! The four pluggable scheduling strategies (spec §4.3–§4.6).

pub mod ap;
pub mod gd_ip;
pub mod ll;
pub mod pbq;

pub use ap::Ap;
pub use gd_ip::GdIp;
pub use ll::Ll;
pub use pbq::Pbq;
