pub use deposit_entry::*;
pub use lockup::*;
pub use voter::*;

mod deposit_entry;
mod lockup;
mod voter;
