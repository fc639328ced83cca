// ── Domain model ──
//
// Types shared between discovery, the protocol client and presentation
// layers.

pub mod device;
pub mod remote;

pub use device::Device;
pub use remote::{ChannelChange, RemoteButton};
