//! SVM solver: wire types, the SMO optimizer and the bundled backend
//!
//! The optimizer follows "Making Large-Scale SVM Learning Practical"
//! (Joachims) for shrinking and Fan, Chen and Lin (2005) for working-set
//! selection.

pub mod backend;
pub mod shrinking;
pub mod smo;
pub mod wire;

pub use self::backend::*;
pub use self::shrinking::*;
pub use self::smo::*;
pub use self::wire::*;
