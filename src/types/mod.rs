pub mod node;
pub mod workload;

// Re-export node types
pub use node::*;
// Re-export workload types
pub use workload::*;
