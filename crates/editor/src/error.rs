use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Product {0} is not in the list")]
    UnknownProduct(i32),

    #[error("Invalid input: {0}")]
    Input(#[from] CoreError),
}
