// ==========================================
// Jury Engine - application layer
// ==========================================
// State wiring and the JSON request surface used by the binary.
// ==========================================

pub mod rpc;
pub mod state;

pub use rpc::{dispatch, handle_json, RpcRequest, RpcResponse};
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
