pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Definition parse error: {message}")]
    Parse { message: String },

    #[error("Invalid config: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("node id `{id}` appears more than once in the layout input")]
    DuplicateNodeId { id: String },

    #[error("layout produced a non-finite coordinate for node `{id}`")]
    NonFiniteCoordinate { id: String },

    #[error("`{id}` is not a Parallel or Map node of this diagram")]
    UnknownGroup { id: String },
}
