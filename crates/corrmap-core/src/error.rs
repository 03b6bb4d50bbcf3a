use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("estimator not prepared: {0}")]
    NotPrepared(&'static str),

    #[error("scratch pool exhausted: worker index {index}, pool size {pool_size}")]
    ScratchExhausted { index: usize, pool_size: usize },

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, CorrError>;
