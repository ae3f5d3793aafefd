mod alloc;
mod global;
mod worker;

pub use self::alloc::IdAllocator;
pub use self::global::ForkId;
pub use self::global::GlobalId;
pub use self::global::RRefId;
pub use self::worker::WorkerId;
