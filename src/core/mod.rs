mod error;
mod ids;

pub(crate) use self::error::raise;

pub use self::ids::ForkId;
pub use self::ids::GlobalId;
pub use self::ids::IdAllocator;
pub use self::ids::RRefId;
pub use self::ids::WorkerId;
