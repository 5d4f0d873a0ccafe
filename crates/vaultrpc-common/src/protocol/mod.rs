pub mod device;
pub mod error;
pub mod requests;
pub mod responses;


pub use device::{ClientVersion, DeviceInfo, Location};
pub use error::{ErrorCode, ErrorInfo, Result, VaultRpcError};
pub use requests::{MethodName, Request, RpcParams};
pub use responses::{Response, RpcResult, STRUCTURED_ERROR_DATA_SINCE};
