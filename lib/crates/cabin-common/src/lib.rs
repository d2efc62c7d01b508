pub mod forward;
pub mod kv;
pub mod record;

pub use forward::{ForwardError, PortForward, parse_set, render_set};
pub use kv::KvError;
pub use record::{
    Credential, InstanceRecord, RecordError, ResourceLimits, SecurityMarker, SecurityState,
};
