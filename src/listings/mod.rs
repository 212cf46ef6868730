pub mod dedup;
pub mod normalize;

pub use dedup::dedup;
pub use normalize::Normalizer;
