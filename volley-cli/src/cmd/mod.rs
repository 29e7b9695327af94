pub mod plan;
pub mod progress;
pub mod run_collection;
pub mod run_flow;
pub mod run_suite;
pub mod validate;

mod load;

pub(crate) use load::{engine_deps, load_workspace, watch_ctrl_c};
