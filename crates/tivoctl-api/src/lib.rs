// tivoctl-api: Wire-level pieces for the TiVo TCP remote protocol and mDNS discovery

pub mod browse;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod transport;

pub use browse::{Advertisement, BrowseConfig, BrowseHandle, SERVICE_TYPE};
pub use codec::ResponseCodec;
pub use error::Error;
pub use protocol::{CommandRequest, ResponseEvent};
pub use transport::{DEFAULT_PORT, TransportConfig};
