pub(crate) mod fabric;
pub(crate) mod node;
pub(crate) mod supervisor;
