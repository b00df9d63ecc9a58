pub mod context;
pub mod infra;
pub mod lookuper;
pub mod output;

pub use context::{CallContext, CancelHandle, ContextError};
pub use infra::keys::{ParameterStore, SsmParameterStore, StoreConfig, StoreError};
pub use lookuper::{Lookuper, SsmLookuper};
