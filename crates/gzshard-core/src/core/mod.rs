pub mod worker_pool;

pub use worker_pool::{
    BlockProcessor, PoolRuntimeSnapshot, WorkerPool, WorkerPoolHandle, WorkerRuntimeSnapshot,
};
