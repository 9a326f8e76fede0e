pub mod config;
pub mod error;
pub mod invoice;
pub mod psp;
pub mod receipt;
pub mod redirect;
pub mod transport;

pub use error::{DriverError, Result};
pub use invoice::Invoice;
pub use psp::sama::{CurrencyUnit, SamaDriver, SamaSettings};
pub use psp::Driver;
pub use receipt::Receipt;
pub use redirect::{HttpMethod, RedirectionForm};
