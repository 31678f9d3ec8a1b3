//! Generated command scripts and the request spool they talk through.

mod am;
mod api;
pub mod catalog;
pub mod rpc;
mod utilities;

pub use catalog::{
    is_engine_generated, CatalogInstall, CatalogStatus, CommandCatalog, GeneratedScript,
    ScriptContext, ScriptKind, WritePolicy, SENTINEL_SCRIPT, STAMP_PREFIX,
};
pub use rpc::{
    ApiChannel, ApiHandler, ApiReply, ApiRequest, ResultFileChannel, ResultFileReceiver, RpcError,
};
