pub mod building;
pub mod scenario;
pub mod storage;
pub mod tariff;
pub mod weather;

pub use building::*;
pub use scenario::*;
pub use storage::*;
pub use tariff::*;
pub use weather::*;
