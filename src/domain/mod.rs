mod account;
mod category;
mod cursor;
mod fanout;
mod ident;
mod merchant;
mod money;
mod stats;
mod transaction;

pub use account::*;
pub use category::*;
pub use cursor::*;
pub use fanout::*;
pub use ident::*;
pub use merchant::*;
pub use money::*;
pub use stats::*;
pub use transaction::*;
