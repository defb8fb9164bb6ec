pub mod transport;
#[cfg(feature = "http")]
pub mod http;

pub use transport::{classify_reply, Channel, ChannelError, Exchange, Reply, RpcTransport, Transport};
#[cfg(feature = "http")]
pub use http::{HttpChannel, HttpConfig, HttpTransport};
