pub mod conv;
pub mod dense;
pub mod initialization;

pub use conv::Conv2DLayer;
pub use dense::DenseLayer;
pub use initialization::WeightInit;
