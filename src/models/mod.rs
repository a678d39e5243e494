pub mod alert;
pub mod protocol;
pub mod refresh;
pub mod score_history;

pub use alert::*;
pub use protocol::*;
pub use refresh::*;
pub use score_history::*;
